//! Time gaps between chained possession events.
//!
//! Two analyses run per match and are then grouped by competition round:
//!
//! - *recovery*: each ball recovery is paired with the latest loss strictly
//!   before it, keeping gaps inside `[min_recovery_secs, max_recovery_secs]`
//! - *transition*: each completed offensive transition is paired with the
//!   latest recovery strictly before it, with no upper bound
//!
//! Points sharing a round are spread horizontally by a symmetric offset so a
//! scatter plot does not stack them. The offset never changes the round or
//! the duration.

use crate::model::{Match, MatchId, Tag};
use crate::taxonomy::Action;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::time::{DEFAULT_MILLIS_THRESHOLD, normalize_seconds, parse_seconds};

/// Tunables for both analyses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairingConfig {
    /// Shortest loss-to-recovery gap kept, inclusive
    pub min_recovery_secs: f64,
    /// Longest loss-to-recovery gap kept, inclusive
    pub max_recovery_secs: f64,
    /// Horizontal distance between neighbouring points of one round
    pub jitter_spread: f64,
    /// Times above this are read as milliseconds
    pub millis_threshold: f64,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            min_recovery_secs: 1.0,
            max_recovery_secs: 3959.0,
            jitter_spread: 0.12,
            millis_threshold: DEFAULT_MILLIS_THRESHOLD,
        }
    }
}

/// Event kinds that take part in pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PossessionKind {
    /// Ball lost
    Loss,
    /// Ball recovered
    Recovery,
    /// Offensive transition completed
    Transition,
}

impl PossessionKind {
    /// Kind of a taxonomy action, if it takes part in pairing.
    #[must_use]
    pub const fn of_action(action: Action) -> Option<Self> {
        match action {
            Action::BallLoss => Some(Self::Loss),
            Action::BallRecovery => Some(Self::Recovery),
            Action::OffensiveTransitionAchieved => Some(Self::Transition),
            _ => None,
        }
    }

    /// Kind of a free-form label, ignoring case and accents.
    #[must_use]
    pub fn of_label(label: &str) -> Option<Self> {
        if let Ok(action) = label.parse::<Action>() {
            return Self::of_action(action);
        }
        match fold(label).as_str() {
            "perdida de balon" | "perdida" => Some(Self::Loss),
            "recuperacion de balon" | "recuperacion" => Some(Self::Recovery),
            "transicion ofensiva lograda" => Some(Self::Transition),
            _ => None,
        }
    }

    const fn time_field(self) -> Option<&'static str> {
        match self {
            Self::Loss => None,
            Self::Recovery => Some("tiempo_recuperacion"),
            Self::Transition => Some("tiempo_transicion"),
        }
    }
}

fn fold(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' => 'u',
            other => other,
        })
        .collect()
}

/// One event placed on a match timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PossessionEvent {
    /// Owning match
    pub match_id: MatchId,
    /// Event kind
    pub kind: PossessionKind,
    /// Normalized seconds
    pub seconds: f64,
}

impl PossessionEvent {
    /// Event for a confirmed tag, or `None` when the tag does not take part.
    #[must_use]
    pub fn from_tag(tag: &Tag, config: &PairingConfig) -> Option<Self> {
        Some(Self {
            match_id: tag.match_id.clone(),
            kind: PossessionKind::of_action(tag.action())?,
            seconds: normalize_seconds(tag.timestamp, config.millis_threshold),
        })
    }

    /// Event for a loose row such as an imported or historical record.
    ///
    /// The time is read from the kind's own field when present, then from
    /// `timestamp`, `tiempo` or `time`. Rows without a readable time are
    /// skipped.
    #[must_use]
    pub fn from_row(row: &Value, config: &PairingConfig) -> Option<Self> {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| row.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        };
        let kind = PossessionKind::of_label(&text(&["action", "accion"])?)?;
        let match_id = MatchId::new(text(&["matchId", "match_id"])?);

        let seconds = kind
            .time_field()
            .into_iter()
            .chain(["timestamp", "tiempo", "time"])
            .filter_map(|k| row.get(k))
            .find_map(parse_seconds)?;

        Some(Self {
            match_id,
            kind,
            seconds: normalize_seconds(seconds, config.millis_threshold),
        })
    }
}

/// One plotted gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    /// Competition round
    pub round: u32,
    /// Presentation-only spread around the round
    pub offset: f64,
    /// `round + offset`
    pub x: f64,
    /// Gap in seconds
    pub duration_secs: f64,
    /// Match the pair came from
    pub match_id: MatchId,
}

/// Symmetric offsets for `n` points: `(i - (n - 1) / 2) * spread`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jitter_offsets(n: usize, spread: f64) -> Vec<f64> {
    let center = n.saturating_sub(1) as f64 / 2.0;
    (0..n).map(|i| (i as f64 - center) * spread).collect()
}

/// Durations from each `effect` to the latest `cause` strictly before it.
///
/// `events` must be one match's timeline in chronological order.
fn gaps(events: &[&PossessionEvent], cause: PossessionKind, effect: PossessionKind) -> Vec<f64> {
    let causes: Vec<f64> = events
        .iter()
        .filter(|e| e.kind == cause)
        .map(|e| e.seconds)
        .collect();

    events
        .iter()
        .filter(|e| e.kind == effect)
        .filter_map(|e| {
            let before = causes.partition_point(|c| *c < e.seconds);
            before.checked_sub(1).map(|i| e.seconds - causes[i])
        })
        .filter(|d| *d >= 0.0)
        .collect()
}

fn scatter(
    events: &[PossessionEvent],
    matches: &[Match],
    config: &PairingConfig,
    cause: PossessionKind,
    effect: PossessionKind,
    keep: impl Fn(f64) -> bool,
) -> Vec<ScatterPoint> {
    let mut by_match: HashMap<&MatchId, Vec<&PossessionEvent>> = HashMap::new();
    for event in events {
        by_match.entry(&event.match_id).or_default().push(event);
    }

    let mut ordered: Vec<&Match> = matches
        .iter()
        .filter(|m| m.round > 0 && by_match.contains_key(&m.id))
        .collect();
    ordered.sort_by(|a, b| {
        (a.round, &a.date, &a.id).cmp(&(b.round, &b.date, &b.id))
    });

    let mut rounds: BTreeMap<u32, Vec<(MatchId, f64)>> = BTreeMap::new();
    for m in ordered {
        let Some(timeline) = by_match.get_mut(&m.id) else {
            continue;
        };
        timeline.sort_by(|a, b| a.seconds.total_cmp(&b.seconds));
        let kept = gaps(timeline, cause, effect).into_iter().filter(|d| keep(*d));
        rounds
            .entry(m.round)
            .or_default()
            .extend(kept.map(|d| (m.id.clone(), d)));
    }

    let mut points: Vec<ScatterPoint> = rounds
        .into_iter()
        .flat_map(|(round, pairs)| {
            let offsets = jitter_offsets(pairs.len(), config.jitter_spread);
            pairs
                .into_iter()
                .zip(offsets)
                .map(move |((match_id, duration_secs), offset)| ScatterPoint {
                    round,
                    offset,
                    x: f64::from(round) + offset,
                    duration_secs,
                    match_id,
                })
        })
        .collect();
    points.sort_by(|a, b| a.round.cmp(&b.round).then(a.offset.total_cmp(&b.offset)));
    points
}

/// Loss-to-recovery gaps per round.
///
/// Matches without an assigned round contribute nothing.
#[must_use]
pub fn recovery_after_loss(
    events: &[PossessionEvent],
    matches: &[Match],
    config: &PairingConfig,
) -> Vec<ScatterPoint> {
    let (min, max) = (config.min_recovery_secs, config.max_recovery_secs);
    scatter(
        events,
        matches,
        config,
        PossessionKind::Loss,
        PossessionKind::Recovery,
        |d| (min..=max).contains(&d),
    )
}

/// Recovery-to-transition gaps per round.
#[must_use]
pub fn transition_after_recovery(
    events: &[PossessionEvent],
    matches: &[Match],
    config: &PairingConfig,
) -> Vec<ScatterPoint> {
    scatter(
        events,
        matches,
        config,
        PossessionKind::Recovery,
        PossessionKind::Transition,
        |_| true,
    )
}

/// Events of every pairing-relevant tag.
#[must_use]
pub fn events_from_tags<'a>(
    tags: impl IntoIterator<Item = &'a Tag>,
    config: &PairingConfig,
) -> Vec<PossessionEvent> {
    tags.into_iter()
        .filter_map(|t| PossessionEvent::from_tag(t, config))
        .collect()
}

/// Both analyses for one set of tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pairing {
    /// Loss-to-recovery points
    pub recoveries: Vec<ScatterPoint>,
    /// Recovery-to-transition points
    pub transitions: Vec<ScatterPoint>,
}

impl Pairing {
    /// Run both analyses.
    #[must_use]
    pub fn build<'a>(
        tags: impl IntoIterator<Item = &'a Tag>,
        matches: &[Match],
        config: &PairingConfig,
    ) -> Self {
        Self::from_events(&events_from_tags(tags, config), matches, config)
    }

    /// Run both analyses over events read elsewhere, such as table rows.
    #[must_use]
    pub fn from_events(events: &[PossessionEvent], matches: &[Match], config: &PairingConfig) -> Self {
        Self {
            recoveries: recovery_after_loss(events, matches, config),
            transitions: transition_after_recovery(events, matches, config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn game(id: &str, round: u32) -> Match {
        Match {
            id: MatchId::from(id),
            tournament: String::new(),
            category: "N/A".into(),
            round,
            opponent: String::new(),
            date: String::new(),
            team_name: String::new(),
            finalized: false,
            videos: vec![],
            drafts: vec![],
        }
    }

    fn ev(match_id: &str, kind: PossessionKind, seconds: f64) -> PossessionEvent {
        PossessionEvent {
            match_id: MatchId::from(match_id),
            kind,
            seconds,
        }
    }

    use PossessionKind::{Loss, Recovery, Transition};

    #[test]
    fn recovery_pairs_with_nearest_preceding_loss() {
        let events = [
            ev("m1", Recovery, 5.0),
            ev("m1", Loss, 40.0),
            ev("m1", Loss, 10.0),
            ev("m1", Recovery, 45.0),
        ];
        let points = recovery_after_loss(&events, &[game("m1", 1)], &PairingConfig::default());

        assert_eq!(points.len(), 1);
        assert!((points[0].duration_secs - 5.0).abs() < f64::EPSILON);
        assert_eq!(points[0].round, 1);
    }

    #[test]
    fn recovery_gaps_outside_bounds_are_discarded() {
        let events = [
            ev("m1", Loss, 0.0),
            ev("m1", Recovery, 4000.0),
            ev("m2", Loss, 0.0),
            ev("m2", Recovery, 3959.0),
            ev("m3", Loss, 10.0),
            ev("m3", Recovery, 10.5),
        ];
        let matches = [game("m1", 1), game("m2", 2), game("m3", 3)];
        let points = recovery_after_loss(&events, &matches, &PairingConfig::default());

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].match_id, MatchId::from("m2"));
    }

    #[test]
    fn simultaneous_loss_is_not_strictly_earlier() {
        let events = [ev("m1", Loss, 30.0), ev("m1", Recovery, 30.0)];
        let config = PairingConfig {
            min_recovery_secs: 0.0,
            ..PairingConfig::default()
        };
        assert!(recovery_after_loss(&events, &[game("m1", 1)], &config).is_empty());
    }

    #[test]
    fn transitions_have_no_upper_bound_and_stay_within_a_match() {
        let events = [
            ev("m1", Recovery, 100.0),
            ev("m2", Transition, 150.0),
            ev("m1", Transition, 5100.0),
        ];
        let matches = [game("m1", 4), game("m2", 4)];
        let points = transition_after_recovery(&events, &matches, &PairingConfig::default());

        assert_eq!(points.len(), 1);
        assert!((points[0].duration_secs - 5000.0).abs() < f64::EPSILON);
        assert!(points[0].offset.abs() < f64::EPSILON);
    }

    #[test]
    fn same_round_points_are_spread_symmetrically() {
        let events = [
            ev("m1", Loss, 10.0),
            ev("m1", Recovery, 20.0),
            ev("m1", Recovery, 50.0),
            ev("m2", Loss, 0.0),
            ev("m2", Recovery, 7.0),
        ];
        let matches = [game("m1", 3), game("m2", 3), game("m9", 0)];
        let points = recovery_after_loss(&events, &matches, &PairingConfig::default());

        let offsets: Vec<f64> = points.iter().map(|p| p.offset).collect();
        let expected = [-0.12, 0.0, 0.12];
        for (got, want) in offsets.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{offsets:?}");
        }
        assert!(points.iter().all(|p| p.round == 3));
        let durations: Vec<f64> = points.iter().map(|p| p.duration_secs).collect();
        assert_eq!(durations, [10.0, 40.0, 7.0]);
    }

    #[test]
    fn unassigned_round_matches_contribute_nothing() {
        let events = [ev("m1", Loss, 10.0), ev("m1", Recovery, 20.0)];
        assert!(recovery_after_loss(&events, &[game("m1", 0)], &PairingConfig::default()).is_empty());
    }

    #[test]
    fn rows_accept_alternate_time_fields() {
        let config = PairingConfig::default();
        let row = json!({
            "accion": "recuperacion de balon",
            "match_id": "m1",
            "tiempo_recuperacion": "1:05",
            "timestamp": 10
        });
        let event = PossessionEvent::from_row(&row, &config).unwrap_or_else(|| ev("x", Loss, -1.0));
        assert_eq!(event.kind, Recovery);
        assert!((event.seconds - 65.0).abs() < f64::EPSILON);

        let millis = json!({ "action": "Pérdida de balón", "matchId": "m1", "tiempo": 45_000 });
        let event = PossessionEvent::from_row(&millis, &config).unwrap_or_else(|| ev("x", Recovery, -1.0));
        assert_eq!(event.kind, Loss);
        assert!((event.seconds - 45.0).abs() < f64::EPSILON);

        let untimed = json!({ "action": "Pérdida de balón", "matchId": "m1", "tiempo": "later" });
        assert!(PossessionEvent::from_row(&untimed, &config).is_none());
    }

    proptest! {
        #[test]
        fn offsets_are_symmetric_and_centered(n in 0usize..40, spread in 0.01f64..1.0) {
            let offsets = jitter_offsets(n, spread);
            prop_assert_eq!(offsets.len(), n);
            for i in 0..n {
                prop_assert!((offsets[i] + offsets[n - 1 - i]).abs() < 1e-9);
            }
            let sum: f64 = offsets.iter().sum();
            prop_assert!(sum.abs() < 1e-6);
        }
    }
}
