//! Screening of raw candidates before they reach the coach.

use crate::analytics::time::parse_seconds;
use crate::model::{MatchId, PlayerId, SuggestionId, Tag};
use crate::taxonomy::Action;
use matchtag_core::environment::IdGenerator;

use super::service::RawSuggestion;
use super::{LearningContext, Suggestion, SuggestionConfig};

const MAX_PATTERN_BOOST: f64 = 0.15;

/// Kept candidates and how many were dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Screened {
    /// Candidates that passed, with ids assigned
    pub kept: Vec<Suggestion>,
    /// Candidates dropped for any reason
    pub dropped: usize,
}

/// Bring a confidence onto `[0, 1]`; values above 1 are percentages.
#[must_use]
pub fn normalize_confidence(confidence: f64) -> f64 {
    if confidence > 1.0 {
        confidence / 100.0
    } else {
        confidence
    }
}

/// Confidence raised by how often the action already occurs.
///
/// The boost is `min(frequency / 10, 0.15)` and the result never exceeds 1.
#[must_use]
pub fn pattern_boost(confidence: f64, frequency: usize) -> f64 {
    if frequency == 0 {
        return confidence;
    }
    #[allow(clippy::cast_precision_loss)]
    let boost = (frequency as f64 / 10.0).min(MAX_PATTERN_BOOST);
    (confidence + boost).min(1.0)
}

fn is_duplicate(action: Action, timestamp: f64, others: impl IntoIterator<Item = (Action, f64)>, window: f64) -> bool {
    others
        .into_iter()
        .any(|(a, t)| a == action && (t - timestamp).abs() <= window)
}

/// Keep candidates with a taxonomy action, a readable time and enough
/// confidence, that do not repeat an existing tag or an earlier candidate.
///
/// Kept candidates then receive the pattern boost. A candidate without a
/// confidence is not subject to the floor.
pub fn screen(
    raw: Vec<RawSuggestion>,
    match_id: &MatchId,
    existing: &[&Tag],
    context: &LearningContext,
    config: &SuggestionConfig,
    ids: &dyn IdGenerator,
) -> Screened {
    let mut screened = Screened::default();

    for candidate in raw {
        let Ok(action) = candidate.action.parse::<Action>() else {
            tracing::debug!(action = %candidate.action, "Dropping candidate outside the taxonomy");
            screened.dropped += 1;
            continue;
        };
        let confidence = candidate.confidence.map(normalize_confidence);
        if confidence.is_some_and(|c| c < config.min_confidence) {
            tracing::debug!(%action, ?confidence, "Dropping low-confidence candidate");
            screened.dropped += 1;
            continue;
        }
        let Some(timestamp) = parse_seconds(&candidate.timestamp) else {
            tracing::debug!(%action, "Dropping candidate without a readable time");
            screened.dropped += 1;
            continue;
        };

        let seen = existing
            .iter()
            .filter(|t| &t.match_id == match_id)
            .map(|t| (t.action(), t.timestamp))
            .chain(screened.kept.iter().map(|s| (s.action, s.timestamp)));
        if is_duplicate(action, timestamp, seen, config.dedup_window_secs) {
            tracing::debug!(%action, timestamp, "Dropping duplicate candidate");
            screened.dropped += 1;
            continue;
        }

        let frequency = context.frequency(action);
        screened.kept.push(Suggestion {
            id: SuggestionId::new(ids.next_id("suggestion")),
            match_id: match_id.clone(),
            timestamp,
            action,
            description: candidate.description,
            confidence: confidence.map(|c| pattern_boost(c, frequency)),
            rationale: candidate.rationale,
            player_id: candidate.player_id.map(PlayerId::new),
        });
    }

    screened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TagId;
    use crate::suggestions::context::ActionCount;
    use matchtag_core::environment::UuidIdGenerator;
    use serde_json::json;

    fn raw(action: &str, at: f64, confidence: Option<f64>) -> RawSuggestion {
        RawSuggestion {
            timestamp: json!(at),
            action: action.to_string(),
            description: String::new(),
            confidence,
            rationale: None,
            player_id: None,
        }
    }

    fn run(raw: Vec<RawSuggestion>, existing: &[&Tag], context: &LearningContext) -> Screened {
        screen(
            raw,
            &MatchId::from("m1"),
            existing,
            context,
            &SuggestionConfig::default(),
            &UuidIdGenerator,
        )
    }

    #[test]
    fn confidence_floor_and_taxonomy_membership() {
        let screened = run(
            vec![
                raw("Tiro de esquina", 10.0, Some(0.5)),
                raw("Chilena", 20.0, Some(0.9)),
                raw("Tiro de esquina", 30.0, Some(0.9)),
                raw("Gol a Favor", 40.0, None),
            ],
            &[],
            &LearningContext::default(),
        );

        assert_eq!(screened.dropped, 2);
        let kept: Vec<Action> = screened.kept.iter().map(|s| s.action).collect();
        assert_eq!(kept, [Action::CornerKick, Action::GoalScored]);
        assert_eq!(screened.kept[0].confidence, Some(0.9));
    }

    #[test]
    fn percentages_are_normalized() {
        let screened = run(
            vec![raw("Tiro de esquina", 1.0, Some(85.0)), raw("Gol a Favor", 9.0, Some(60.0))],
            &[],
            &LearningContext::default(),
        );
        assert_eq!(screened.kept.len(), 1);
        assert_eq!(screened.kept[0].confidence, Some(0.85));
    }

    #[test]
    fn repeats_of_tags_and_earlier_candidates_are_dropped() {
        let tag = Tag::new(
            TagId::from("t1"),
            MatchId::from("m1"),
            PlayerId::from("p1"),
            Action::CornerKick,
            100.0,
        );
        let elsewhere = Tag::new(
            TagId::from("t2"),
            MatchId::from("m2"),
            PlayerId::from("p1"),
            Action::GoalScored,
            50.0,
        );
        let screened = run(
            vec![
                raw("Tiro de esquina", 101.5, Some(0.9)),
                raw("Gol a Favor", 50.0, Some(0.9)),
                raw("Gol a Favor", 51.0, Some(0.9)),
                raw("Tiro de esquina", 103.0, Some(0.9)),
            ],
            &[&tag, &elsewhere],
            &LearningContext::default(),
        );

        let kept: Vec<(Action, f64)> = screened.kept.iter().map(|s| (s.action, s.timestamp)).collect();
        assert_eq!(kept, [(Action::GoalScored, 50.0), (Action::CornerKick, 103.0)]);
        assert_eq!(screened.dropped, 2);
    }

    #[test]
    fn frequent_actions_get_a_capped_boost() {
        assert!((pattern_boost(0.8, 1) - 0.9).abs() < 1e-9);
        assert!((pattern_boost(0.8, 40) - 0.95).abs() < 1e-9);
        assert!((pattern_boost(0.95, 40) - 1.0).abs() < 1e-9);
        assert!((pattern_boost(0.8, 0) - 0.8).abs() < 1e-9);

        let context = LearningContext {
            histogram: vec![ActionCount {
                action: Action::CornerKick,
                count: 1,
            }],
            ..LearningContext::default()
        };
        let screened = run(vec![raw("Tiro de esquina", 5.0, Some(0.7))], &[], &context);
        let boosted = screened.kept[0].confidence.unwrap_or_default();
        assert!((boosted - 0.8).abs() < 1e-9);
    }
}
