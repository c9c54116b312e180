//! # Matchtag
//!
//! Tagging of soccer match video for one coach and any number of read-only
//! viewers.
//!
//! - [`taxonomy`]: the fixed action set and the result rule
//! - [`event_store`]: edits to the coach's snapshot as pure operations
//! - [`session`]: the coach's store, which applies edits and pushes them
//! - [`sync`]: the wire format, push ordering and live viewer mirrors
//! - [`analytics`]: dashboards, temporal pairing and export rows
//! - [`suggestions`]: AI-proposed tags screened before review
//!
//! ## Example
//!
//! ```ignore
//! use matchtag::{CoachEnvironment, CoachSession, ViewerSession};
//!
//! let coach = CoachSession::connect(env).await?;
//! coach.add_tag(new_tag).await?;
//!
//! let viewer = ViewerSession::connect(documents, "coach", PairingConfig::default()).await?;
//! let dashboard = viewer.dashboard(&Filters::default()).await;
//! ```

pub mod analytics;
pub mod backup;
pub mod config;
pub mod error;
pub mod event_store;
pub mod history;
pub mod mocks;
pub mod model;
pub mod reducer;
pub mod session;
pub mod suggestions;
pub mod sync;
pub mod taxonomy;

pub use config::Config;
pub use error::TaggingError;
pub use model::{
    DetectedPlay, DraftId, Match, MatchId, NewMatch, NewPlayer, NewTag, Player, PlayerId, Snapshot,
    SuggestionId, Tag, TagId, TagPatch, Unrecognized, VideoRef,
};
pub use reducer::{CoachAction, CoachEnvironment, CoachReducer, CoachState, SyncStatus};
pub use session::CoachSession;
pub use sync::{SyncError, ViewerSession};
pub use taxonomy::{Action, ActionCategory, ResultLabel, classify};
