use serde::Deserialize;

/// One innings line as reported by the match feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InningsScore {
    #[serde(default)]
    pub inning: String,
    #[serde(default, rename = "r")]
    pub runs: i64,
    #[serde(default, rename = "w")]
    pub wickets: i64,
    #[serde(default, rename = "o")]
    pub overs: f64,
}

/// Wire shape of one match from the currentMatches feed. Every field is
/// defaulted so a sparse payload still deserializes; the defaults are chosen
/// so that a match with no usable data classifies as neutral downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "matchType")]
    pub match_type: String,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub score: Vec<InningsScore>,
    #[serde(default, rename = "matchStarted")]
    pub started: bool,
    #[serde(default, rename = "matchEnded")]
    pub ended: bool,
}

/// Numeric state computed from one snapshot. `overs_left` is `None` for
/// formats without an over limit or when no innings data exists yet, which
/// keeps unknown matches out of the tension branch of the classifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedState {
    pub required_run_rate: f64,
    pub overs_left: Option<u32>,
    pub match_type: String,
    pub ended: bool,
}

/// One match moment: the human-readable summary fed to prompts plus the
/// numeric state fed to the classifier. Built fresh each poll cycle.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub summary: String,
    pub state: DerivedState,
}

const INTERNATIONAL_KEYWORDS: [&str; 7] =
    ["ICC", "ACC", "World Cup", "Asia Cup", "T20I", "ODI", " tour of "];

fn overs_for_format(match_type: &str) -> Option<u32> {
    match match_type.to_lowercase().as_str() {
        "t20" => Some(20),
        "odi" => Some(50),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn derive_state(snapshot: &MatchSnapshot) -> DerivedState {
    let mut state = DerivedState {
        required_run_rate: 0.0,
        overs_left: None,
        match_type: snapshot.match_type.clone(),
        ended: snapshot.ended,
    };

    let max_overs = match overs_for_format(&snapshot.match_type) {
        Some(overs) => overs,
        None => return state,
    };
    let current = match snapshot.score.last() {
        Some(innings) => innings,
        None => return state,
    };

    let bowled = current.overs.max(0.0);
    let left = (f64::from(max_overs) - bowled).max(0.0) as u32;
    state.overs_left = Some(left);

    if snapshot.score.len() >= 2 {
        // Chasing side: target is the first innings total plus one.
        let target = snapshot.score[0].runs + 1;
        let needed = (target - current.runs).max(0);
        if left > 0 {
            state.required_run_rate = round2(needed as f64 / f64::from(left));
        }
    }

    state
}

pub fn event_summary(snapshot: &MatchSnapshot) -> String {
    let name = if snapshot.name.is_empty() {
        "Match"
    } else {
        &snapshot.name
    };
    let status = if snapshot.status.is_empty() {
        "Unknown status"
    } else {
        &snapshot.status
    };
    let score_parts: Vec<String> = snapshot
        .score
        .iter()
        .map(|innings| {
            format!(
                "{}: {}/{} ({} overs)",
                innings.inning, innings.runs, innings.wickets, innings.overs
            )
        })
        .collect();
    format!("{}. {}. {}", name, status, score_parts.join(" | "))
        .trim()
        .to_string()
}

pub fn is_international(snapshot: &MatchSnapshot) -> bool {
    let name = snapshot.name.trim();
    INTERNATIONAL_KEYWORDS.iter().any(|kw| name.contains(kw))
}

pub fn has_india_team(snapshot: &MatchSnapshot) -> bool {
    snapshot
        .teams
        .iter()
        .any(|team| team == "India" || team.starts_with("India "))
}

pub fn has_women_team(snapshot: &MatchSnapshot) -> bool {
    snapshot
        .teams
        .iter()
        .any(|team| team.contains(" Women") || team.ends_with("Women"))
}

/// Filter the feed down to the matches worth watching and order live
/// in-progress matches first. Keeps international men's matches with an
/// India side; domestic leagues and women's matches are skipped.
pub fn select_events(snapshots: &[MatchSnapshot]) -> Vec<EventRecord> {
    let mut live = Vec::new();
    let mut other = Vec::new();

    for snapshot in snapshots {
        if !is_international(snapshot)
            || !has_india_team(snapshot)
            || has_women_team(snapshot)
        {
            continue;
        }
        let record = EventRecord {
            summary: event_summary(snapshot),
            state: derive_state(snapshot),
        };
        if snapshot.started && !snapshot.ended {
            live.push(record);
        } else {
            other.push(record);
        }
    }

    live.extend(other);
    live
}
