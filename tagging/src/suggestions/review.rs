//! In-memory review state: proposals awaiting a decision and the feedback log.

use crate::model::{MatchId, SuggestionId};
use crate::taxonomy::Action;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Suggestion, SuggestionError};

const TOP_ACCEPTED: usize = 5;

/// Outcome of one reviewed suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Suggestion reviewed
    pub suggestion_id: SuggestionId,
    /// Action that was proposed
    pub action: Action,
    /// Whether the coach kept it
    pub accepted: bool,
    /// Action the coach used instead, if they corrected it
    pub corrected_action: Option<Action>,
    /// When the decision was made
    pub recorded_at: DateTime<Utc>,
}

/// Suggestion-related part of the coach's state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewState {
    /// Proposals awaiting a decision, in arrival order
    pub proposals: Vec<Suggestion>,
    /// Every decision so far, oldest first
    pub feedback: Vec<FeedbackRecord>,
    /// Match of the outstanding request, if one is in flight
    pub in_flight: Option<MatchId>,
    /// Outcome of the last request when it failed
    pub last_error: Option<SuggestionError>,
}

impl ReviewState {
    /// Whether a request is outstanding.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Remove a proposal, returning it.
    pub fn take(&mut self, id: &SuggestionId) -> Option<Suggestion> {
        let index = self.proposals.iter().position(|s| &s.id == id)?;
        Some(self.proposals.remove(index))
    }

    /// Look at a proposal without changing anything.
    #[must_use]
    pub fn preview(&self, id: &SuggestionId) -> Option<&Suggestion> {
        self.proposals.iter().find(|s| &s.id == id)
    }
}

/// Summary of the feedback log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackStats {
    /// Decisions recorded
    pub total: usize,
    /// Accepted suggestions
    pub accepted: usize,
    /// Rejected suggestions
    pub rejected: usize,
    /// `accepted / total` as a percentage, one decimal
    pub accuracy: f64,
    /// Most frequently accepted actions
    pub top_accepted: Vec<(Action, usize)>,
}

/// Totals, accuracy and the five most accepted actions.
#[must_use]
pub fn feedback_stats(feedback: &[FeedbackRecord]) -> FeedbackStats {
    let total = feedback.len();
    let accepted = feedback.iter().filter(|f| f.accepted).count();

    #[allow(clippy::cast_precision_loss)]
    let accuracy = if total == 0 {
        0.0
    } else {
        (accepted as f64 / total as f64 * 1000.0).round() / 10.0
    };

    let mut counts: HashMap<Action, usize> = HashMap::new();
    for record in feedback.iter().filter(|f| f.accepted) {
        *counts
            .entry(record.corrected_action.unwrap_or(record.action))
            .or_default() += 1;
    }
    let mut top_accepted: Vec<(Action, usize)> = counts.into_iter().collect();
    top_accepted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_accepted.truncate(TOP_ACCEPTED);

    FeedbackStats {
        total,
        accepted,
        rejected: total - accepted,
        accuracy,
        top_accepted,
    }
}
