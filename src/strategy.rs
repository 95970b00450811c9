use crate::NarrativeLabel;

/// Minimum virality score for an event to be worth posting.
pub const POST_THRESHOLD: i32 = 50;

/// Additive virality score for one event/label pair. The postable-label
/// term is redundant with the early return in `should_post` but is kept so
/// the score stands on its own for neutral events.
pub fn virality_score(summary: &str, label: NarrativeLabel) -> i32 {
    let mut score = 0;

    if summary.contains("WICKET") {
        score += 30;
    }

    if label.is_postable() {
        score += 30;
    }

    if summary.to_lowercase().contains("last over") {
        score += 40;
    }

    score
}

/// Decide whether an event/label pair crosses the posting bar. Panic, hype
/// and tension always post; neutral events only post when the raw virality
/// score carries them over the threshold.
pub fn should_post(summary: &str, label: NarrativeLabel) -> bool {
    if label.is_postable() {
        return true;
    }

    virality_score(summary, label) >= POST_THRESHOLD
}
