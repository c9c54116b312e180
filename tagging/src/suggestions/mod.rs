//! AI-assisted action suggestions.
//!
//! A request packages a [`LearningContext`] built from historical tags with
//! the current match's recent tags and sends it to a [`SuggestionService`].
//! Candidates come back as loose records; [`filter::screen`] keeps the ones
//! that name a taxonomy action, clear the confidence floor and do not repeat
//! an existing tag. Kept candidates live only in memory until the coach
//! accepts them (they become tags) or rejects them.

pub mod context;
pub mod filter;
pub mod prompt;
pub mod review;
pub mod service;

pub use context::{GamePhase, LearningContext};
pub use review::{FeedbackRecord, FeedbackStats, ReviewState, feedback_stats};
pub use service::{
    AnthropicSuggestionService, Frame, RawSuggestion, SuggestionRequest, SuggestionService,
};

use crate::model::{MatchId, PlayerId, SuggestionId};
use crate::taxonomy::Action;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to the coach when asking for suggestions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SuggestionError {
    /// A request is already outstanding
    #[error("A suggestion request is already in flight")]
    Busy,

    /// The generative service failed
    #[error("Suggestion service failed: {0}")]
    Service(String),

    /// The service answered with something that is not a candidate list
    #[error("Malformed suggestion response: {0}")]
    MalformedResponse(String),
}

/// Tunables for building requests and screening candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// Candidates below this confidence are dropped
    pub min_confidence: f64,
    /// Largest gap between a tag and its follow-up
    pub follow_up_window_secs: f64,
    /// Feedback records used for the acceptance rate
    pub feedback_window: usize,
    /// Recent tags of the match sent with a request
    pub recent_tag_limit: usize,
    /// Same-action candidates closer than this to a tag are duplicates
    pub dedup_window_secs: f64,
    /// Model used by the Anthropic-backed service
    pub model: String,
    /// Response token ceiling
    pub max_tokens: u32,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            follow_up_window_secs: 30.0,
            feedback_window: 50,
            recent_tag_limit: 20,
            dedup_window_secs: 2.0,
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 2048,
        }
    }
}

/// A screened candidate awaiting review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// In-memory identity
    pub id: SuggestionId,
    /// Match the suggestion was requested for
    pub match_id: MatchId,
    /// Seconds from the start of the match video
    pub timestamp: f64,
    /// Proposed action
    pub action: Action,
    /// What the service saw
    pub description: String,
    /// Confidence in `[0, 1]`, after any pattern boost
    pub confidence: Option<f64>,
    /// Why the service proposed it
    pub rationale: Option<String>,
    /// Player the service attributed it to, if any
    pub player_id: Option<PlayerId>,
}
