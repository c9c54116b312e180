//! Errors surfaced by the coach session.

use crate::backup::BackupError;
use crate::event_store::OpError;
use crate::model::MatchId;
use crate::suggestions::SuggestionError;
use crate::sync::SyncError;
use matchtag_core::table::TableError;
use matchtag_runtime::StoreError;
use thiserror::Error;

/// Failures reported to the coach's UI.
///
/// Reducer-level problems never appear here: a missing id there is logged
/// and ignored. These come from the session's own checks and plumbing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaggingError {
    /// The target match is finalized; the operation was not attempted
    #[error("Match {0} is finalized")]
    MatchFinalized(MatchId),

    /// A referenced record does not exist
    #[error(transparent)]
    NotFound(#[from] OpError),

    /// The state container refused the action
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Talking to the document store failed
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A suggestion request failed or was refused
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),

    /// Reading or writing the history table failed
    #[error(transparent)]
    History(#[from] TableError),

    /// A backup could not be produced or read
    #[error(transparent)]
    Backup(#[from] BackupError),
}
