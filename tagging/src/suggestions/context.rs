//! Statistical summary of historical tags used to prime a request.

use crate::model::{MatchId, PlayerId, Tag};
use crate::taxonomy::Action;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::SuggestionConfig;
use super::review::FeedbackRecord;

/// Average timestamps below this are early-game actions.
pub const EARLY_PHASE_END_SECS: f64 = 1500.0;
/// Average timestamps above this are late-game actions.
pub const LATE_PHASE_START_SECS: f64 = 3600.0;

const TOP_PLAYER_ACTIONS: usize = 5;
const TOP_FOLLOW_UPS: usize = 3;

/// Coarse part of the match an action usually happens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Before 1500 s on average
    Early,
    /// Between the two thresholds
    Mid,
    /// After 3600 s on average
    Late,
}

impl GamePhase {
    /// Phase of an average timestamp.
    #[must_use]
    pub fn of_average(seconds: f64) -> Self {
        if seconds < EARLY_PHASE_END_SECS {
            Self::Early
        } else if seconds > LATE_PHASE_START_SECS {
            Self::Late
        } else {
            Self::Mid
        }
    }
}

/// How often an action appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionCount {
    /// Action
    pub action: Action,
    /// Occurrences
    pub count: usize,
}

/// Per-action success and timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActionProfile {
    /// Action
    pub action: Action,
    /// Occurrences
    pub count: usize,
    /// Share of occurrences with a successful result
    pub success_rate: f64,
    /// Mean timestamp
    pub average_secs: f64,
    /// Phase of the mean timestamp
    pub phase: GamePhase,
}

/// Aggregate view of historical tags. Rebuilt on demand, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LearningContext {
    /// Tags summarized
    pub total_tags: usize,
    /// Action frequencies, most frequent first
    pub histogram: Vec<ActionCount>,
    /// Five most frequent actions per player
    pub player_preferences: BTreeMap<PlayerId, Vec<ActionCount>>,
    /// Success rate and phase per action
    pub profiles: Vec<ActionProfile>,
    /// Three most frequent follow-ups per antecedent action
    pub follow_ups: BTreeMap<Action, Vec<ActionCount>>,
    /// Share of accepted suggestions in the recent feedback, if any
    pub acceptance_rate: Option<f64>,
}

fn ranked(counts: HashMap<Action, usize>, limit: usize) -> Vec<ActionCount> {
    let mut ranked: Vec<ActionCount> = counts
        .into_iter()
        .map(|(action, count)| ActionCount { action, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(a.action.cmp(&b.action)));
    ranked.truncate(limit);
    ranked
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

impl LearningContext {
    /// Summarize `tags` and the most recent `feedback`.
    ///
    /// `feedback` is in the order it was recorded; only the last
    /// `feedback_window` records count towards the acceptance rate.
    #[must_use]
    pub fn build(tags: &[Tag], feedback: &[FeedbackRecord], config: &SuggestionConfig) -> Self {
        let mut histogram: HashMap<Action, usize> = HashMap::new();
        let mut by_player: HashMap<&PlayerId, HashMap<Action, usize>> = HashMap::new();
        let mut outcomes: HashMap<Action, (usize, usize, f64)> = HashMap::new();

        for tag in tags {
            *histogram.entry(tag.action()).or_default() += 1;
            *by_player
                .entry(&tag.player_id)
                .or_default()
                .entry(tag.action())
                .or_default() += 1;
            let entry = outcomes.entry(tag.action()).or_default();
            entry.0 += 1;
            entry.1 += usize::from(tag.result().is_success());
            entry.2 += tag.timestamp;
        }

        let mut profiles: Vec<ActionProfile> = outcomes
            .into_iter()
            .map(|(action, (count, successes, total_secs))| {
                #[allow(clippy::cast_precision_loss)]
                let average_secs = total_secs / count as f64;
                ActionProfile {
                    action,
                    count,
                    success_rate: ratio(successes, count),
                    average_secs,
                    phase: GamePhase::of_average(average_secs),
                }
            })
            .collect();
        profiles.sort_by_key(|p| p.action);

        let recent = &feedback[feedback.len().saturating_sub(config.feedback_window)..];
        let acceptance_rate = (!recent.is_empty())
            .then(|| ratio(recent.iter().filter(|f| f.accepted).count(), recent.len()));

        Self {
            total_tags: tags.len(),
            histogram: ranked(histogram, usize::MAX),
            player_preferences: by_player
                .into_iter()
                .map(|(player, counts)| (player.clone(), ranked(counts, TOP_PLAYER_ACTIONS)))
                .collect(),
            profiles,
            follow_ups: follow_ups(tags, config.follow_up_window_secs),
            acceptance_rate,
        }
    }

    /// Occurrences of `action` in the histogram.
    #[must_use]
    pub fn frequency(&self, action: Action) -> usize {
        self.histogram
            .iter()
            .find(|c| c.action == action)
            .map_or(0, |c| c.count)
    }
}

/// Mine consecutive same-match pairs no more than `window` seconds apart.
fn follow_ups(tags: &[Tag], window: f64) -> BTreeMap<Action, Vec<ActionCount>> {
    let mut by_match: HashMap<&MatchId, Vec<&Tag>> = HashMap::new();
    for tag in tags {
        by_match.entry(&tag.match_id).or_default().push(tag);
    }

    let mut pairs: HashMap<Action, HashMap<Action, usize>> = HashMap::new();
    for timeline in by_match.values_mut() {
        timeline.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        for pair in timeline.windows(2) {
            let gap = pair[1].timestamp - pair[0].timestamp;
            if (0.0..=window).contains(&gap) {
                *pairs
                    .entry(pair[0].action())
                    .or_default()
                    .entry(pair[1].action())
                    .or_default() += 1;
            }
        }
    }

    pairs
        .into_iter()
        .map(|(antecedent, counts)| (antecedent, ranked(counts, TOP_FOLLOW_UPS)))
        .collect()
}
