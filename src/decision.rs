use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{GenerationError, NarrativeLabel, TextGenerator};

/// Default number of candidates drafted per decision.
pub const DEFAULT_CANDIDATES: usize = 3;
/// Neutral prior when the predictor returns no usable number.
pub const NEUTRAL_PREDICTED_SCORE: u8 = 50;

const MIN_CANDIDATE_CHARS: usize = 10;
const MAX_CANDIDATE_CHARS: usize = 280;
const MAX_STYLE_EXAMPLES: usize = 20;
const FALLBACK_STYLE: &str = "Short. Punchy. Emotional.";

/// The chosen post and the engagement the model expects it to earn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub text: String,
    pub predicted_score: u8,
}

/// Past posts fed into prompts so new drafts keep the account's voice.
/// Loaded once from a JSON array of strings; anything missing or malformed
/// falls back to a built-in one-liner.
#[derive(Debug, Clone)]
pub struct StyleBook {
    examples: String,
}

impl StyleBook {
    pub fn load(path: &Path) -> Self {
        let examples = fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .filter(|posts| !posts.is_empty())
            .map(|posts| {
                posts
                    .iter()
                    .take(MAX_STYLE_EXAMPLES)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_else(|| FALLBACK_STYLE.to_string());
        Self { examples }
    }

    pub fn fallback() -> Self {
        Self {
            examples: FALLBACK_STYLE.to_string(),
        }
    }
}

/// Extract a 0-100 score from a raw model reply. All digits are collected
/// in order; runs longer than two digits keep only the first two; a reply
/// with no digits at all maps to the neutral prior. Never fails.
pub fn parse_predicted_score(raw: &str) -> u8 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return NEUTRAL_PREDICTED_SCORE;
    }
    let run = if digits.len() > 2 {
        &digits[..2]
    } else {
        digits.as_str()
    };
    run.parse::<u32>()
        .map(|value| value.min(100) as u8)
        .unwrap_or(NEUTRAL_PREDICTED_SCORE)
}

/// Split a multi-candidate completion into validated candidates: first `n`
/// non-empty lines, enumeration markers stripped, length in (10, 280] chars.
fn parse_candidates(raw: &str, n: usize) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(n)
        .filter_map(|line| {
            let cleaned = line
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | ' ')
                })
                .to_string();
            let chars = cleaned.chars().count();
            (chars > MIN_CANDIDATE_CHARS && chars <= MAX_CANDIDATE_CHARS).then_some(cleaned)
        })
        .collect()
}

/// Candidate generation, engagement prediction and selection for one event.
/// Holds no mutable state; every call is one decision cycle's worth of
/// sequential generation-service traffic.
pub struct DecisionEngine<G> {
    generator: G,
    style: StyleBook,
}

impl<G: TextGenerator> DecisionEngine<G> {
    pub fn new(generator: G, style: StyleBook) -> Self {
        Self { generator, style }
    }

    /// Generate up to `n` candidates, score each, return the highest-scoring
    /// one (first seen wins ties). When generation yields nothing usable,
    /// falls back to a one-shot draft which is scored and returned
    /// unconditionally. Only rate-limit and transport errors escape.
    pub async fn run_decision(
        &self,
        summary: &str,
        label: NarrativeLabel,
        n: usize,
    ) -> Result<Decision, GenerationError> {
        let candidates = self.generate_candidates(summary, label, n).await?;

        if candidates.is_empty() {
            debug!("no valid candidates, using one-shot fallback");
            let text = self.generate_single(summary, label).await?;
            let predicted_score = self.predict_engagement(&text, summary, label).await?;
            return Ok(Decision {
                text,
                predicted_score,
            });
        }

        let mut scored = Vec::with_capacity(candidates.len());
        for text in candidates {
            let predicted_score = self.predict_engagement(&text, summary, label).await?;
            debug!(predicted_score, "scored candidate");
            scored.push(Decision {
                text,
                predicted_score,
            });
        }

        let mut best = scored.remove(0);
        for candidate in scored {
            if candidate.predicted_score > best.predicted_score {
                best = candidate;
            }
        }
        Ok(best)
    }

    /// One generation call asking for `n` distinct drafts; may return fewer
    /// (or none) after validation.
    pub async fn generate_candidates(
        &self,
        summary: &str,
        label: NarrativeLabel,
        n: usize,
    ) -> Result<Vec<String>, GenerationError> {
        let raw = self
            .generator
            .complete(&self.candidates_prompt(summary, label, n))
            .await?;
        Ok(parse_candidates(&raw, n))
    }

    pub async fn generate_single(
        &self,
        summary: &str,
        label: NarrativeLabel,
    ) -> Result<String, GenerationError> {
        let raw = self
            .generator
            .complete(&self.single_prompt(summary, label))
            .await?;
        Ok(raw.trim().to_string())
    }

    /// Ask the model for a bare 0-100 number for one candidate. Malformed
    /// replies degrade to the neutral prior instead of failing the cycle.
    pub async fn predict_engagement(
        &self,
        text: &str,
        summary: &str,
        label: NarrativeLabel,
    ) -> Result<u8, GenerationError> {
        let raw = self
            .generator
            .complete(&score_prompt(text, summary, label))
            .await?;
        Ok(parse_predicted_score(&raw))
    }

    fn candidates_prompt(&self, summary: &str, label: NarrativeLabel, n: usize) -> String {
        format!(
            "You are a die-hard cricket fan account posting on X.\n\n\
             Rules:\n\
             - Short punchy posts\n\
             - Emotional and opinionated\n\
             - Never sound like commentary\n\
             - Max 220 characters per post\n\n\
             Mood: {}\n\
             Moment: {}\n\n\
             Style examples:\n{}\n\n\
             Write exactly {} DIFFERENT post options. Each must take a \
             different angle or tone (e.g. hype vs fear, stats vs emotion).\n\
             Output ONLY the posts, one per line, no numbering or labels.",
            label.label(),
            summary,
            self.style.examples,
            n
        )
    }

    fn single_prompt(&self, summary: &str, label: NarrativeLabel) -> String {
        format!(
            "You are a die-hard cricket fan account posting on X.\n\n\
             Rules:\n\
             - Short punchy posts\n\
             - Emotional and opinionated\n\
             - Never sound like commentary\n\
             - Max 220 characters\n\n\
             Mood: {}\n\
             Moment: {}\n\n\
             Style examples:\n{}\n\n\
             Write ONE post.",
            label.label(),
            summary,
            self.style.examples
        )
    }
}

fn score_prompt(text: &str, summary: &str, label: NarrativeLabel) -> String {
    format!(
        "You are judging how viral a cricket post will be on X.\n\n\
         Moment: {}\n\
         Mood: {}\n\n\
         Post to score:\n\"{}\"\n\n\
         Consider: punchiness, emotional pull, reply bait, relevance to the \
         moment, length.\n\
         Reply with ONLY a number from 0 to 100 (no explanation).",
        summary,
        label.label(),
        text
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::EmptyResponse))
        }
    }

    fn engine(replies: Vec<Result<String, GenerationError>>) -> DecisionEngine<ScriptedGenerator> {
        DecisionEngine::new(ScriptedGenerator::new(replies), StyleBook::fallback())
    }

    #[test]
    fn score_parsing_follows_the_documented_rule() {
        assert_eq!(parse_predicted_score("87"), 87);
        assert_eq!(parse_predicted_score("Score: 87!"), 87);
        assert_eq!(parse_predicted_score("873"), 87);
        assert_eq!(parse_predicted_score("no number here"), 50);
        assert_eq!(parse_predicted_score("0"), 0);
        assert_eq!(parse_predicted_score(""), 50);
    }

    #[test]
    fn parsed_scores_stay_in_range() {
        for raw in ["999999", "100", "-5", "about 70 or 80", "!!!"] {
            assert!(parse_predicted_score(raw) <= 100);
        }
    }

    #[test]
    fn candidate_parsing_strips_enumeration_and_filters_length() {
        let raw = "1. Kohli has absolutely flipped this chase on its head\n\
                   2) short\n\
                   - What a night for Indian cricket, scenes in the stands";
        let candidates = parse_candidates(raw, 3);
        assert_eq!(
            candidates,
            vec![
                "Kohli has absolutely flipped this chase on its head".to_string(),
                "What a night for Indian cricket, scenes in the stands".to_string(),
            ]
        );
    }

    #[test]
    fn candidate_parsing_takes_only_the_first_n_lines() {
        let raw = "First candidate line that is long enough\n\
                   Second candidate line that is long enough\n\
                   Third candidate line that is long enough\n\
                   Fourth candidate line that is long enough";
        assert_eq!(parse_candidates(raw, 3).len(), 3);
    }

    #[test]
    fn oversized_candidates_are_dropped() {
        let long_line = "x".repeat(281);
        assert!(parse_candidates(&long_line, 3).is_empty());
        let ok_line = "y".repeat(280);
        assert_eq!(parse_candidates(&ok_line, 3).len(), 1);
    }

    #[tokio::test]
    async fn selector_returns_the_highest_scored_candidate() {
        let engine = engine(vec![
            Ok("Alpha take on tonight's collapse\n\
                Bravo take on tonight's collapse\n\
                Charlie take on tonight's collapse"
                .to_string()),
            Ok("40".to_string()),
            Ok("90".to_string()),
            Ok("10".to_string()),
        ]);
        let decision = engine
            .run_decision("WICKET", NarrativeLabel::Panic, 3)
            .await
            .unwrap();
        assert_eq!(decision.text, "Bravo take on tonight's collapse");
        assert_eq!(decision.predicted_score, 90);
    }

    #[tokio::test]
    async fn ties_keep_the_first_candidate_seen() {
        let engine = engine(vec![
            Ok("First equally good candidate line\nSecond equally good candidate line"
                .to_string()),
            Ok("70".to_string()),
            Ok("70".to_string()),
        ]);
        let decision = engine
            .run_decision("six!", NarrativeLabel::Hype, 2)
            .await
            .unwrap();
        assert_eq!(decision.text, "First equally good candidate line");
    }

    #[tokio::test]
    async fn empty_generation_falls_back_to_one_shot() {
        let engine = engine(vec![
            Ok(String::new()),
            Ok("Fallback post about the finish tonight".to_string()),
            Ok("61".to_string()),
        ]);
        let decision = engine
            .run_decision("last over", NarrativeLabel::Tension, 3)
            .await
            .unwrap();
        assert_eq!(decision.text, "Fallback post about the finish tonight");
        assert_eq!(decision.predicted_score, 61);
    }

    #[tokio::test]
    async fn rate_limit_propagates_to_the_caller() {
        let engine = engine(vec![Err(GenerationError::RateLimited {
            quota_exhausted: true,
        })]);
        let err = engine
            .run_decision("WICKET", NarrativeLabel::Panic, 3)
            .await
            .unwrap_err();
        assert!(err.is_quota_exhausted());
    }
}
