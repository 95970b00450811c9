use crate::events::DerivedState;
use crate::NarrativeLabel;

/// Required run rate above which a falling wicket reads as panic.
const PANIC_REQUIRED_RATE: f64 = 10.0;
/// Overs remaining below which a finish reads as tension.
const TENSION_OVERS_LEFT: u32 = 3;

/// Map one match moment to a narrative label. Total and deterministic;
/// rules are evaluated in priority order and the first match wins. A
/// snapshot with no usable state (no overs limit, no innings yet) falls
/// through to neutral.
pub fn classify(summary: &str, state: &DerivedState) -> NarrativeLabel {
    if summary.contains("WICKET") && state.required_run_rate > PANIC_REQUIRED_RATE {
        return NarrativeLabel::Panic;
    }

    if summary.to_lowercase().contains("six") {
        return NarrativeLabel::Hype;
    }

    if state.overs_left.is_some_and(|left| left < TENSION_OVERS_LEFT) {
        return NarrativeLabel::Tension;
    }

    NarrativeLabel::Neutral
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(required_run_rate: f64, overs_left: Option<u32>) -> DerivedState {
        DerivedState {
            required_run_rate,
            overs_left,
            match_type: "t20".to_string(),
            ended: false,
        }
    }

    #[test]
    fn wicket_under_pressure_is_panic() {
        let label = classify("WICKET! Kohli departs", &state(12.4, Some(8)));
        assert_eq!(label, NarrativeLabel::Panic);
    }

    #[test]
    fn panic_wins_regardless_of_other_rules() {
        // Also contains "six" and has few overs left; wicket rule fires first.
        let label = classify("WICKET after a six!", &state(11.0, Some(1)));
        assert_eq!(label, NarrativeLabel::Panic);
    }

    #[test]
    fn wicket_without_pressure_is_not_panic() {
        let label = classify("WICKET! early breakthrough", &state(0.0, Some(18)));
        assert_eq!(label, NarrativeLabel::Neutral);
    }

    #[test]
    fn six_is_hype_case_insensitive() {
        assert_eq!(
            classify("SIX! that's gone miles", &state(0.0, Some(10))),
            NarrativeLabel::Hype
        );
        assert_eq!(
            classify("Massive six over long on", &state(0.0, Some(10))),
            NarrativeLabel::Hype
        );
    }

    #[test]
    fn final_overs_are_tension() {
        let label = classify("Tight finish in Mumbai", &state(8.0, Some(2)));
        assert_eq!(label, NarrativeLabel::Tension);
    }

    #[test]
    fn unknown_overs_are_not_tension() {
        let label = classify("Day 3, session 2", &state(0.0, None));
        assert_eq!(label, NarrativeLabel::Neutral);
    }

    #[test]
    fn classify_is_deterministic() {
        let s = state(12.0, Some(5));
        let first = classify("WICKET in the chase", &s);
        for _ in 0..10 {
            assert_eq!(classify("WICKET in the chase", &s), first);
        }
    }
}
