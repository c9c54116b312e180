//! Replication of the coach's snapshot through the document store.
//!
//! The coach is the single writer: after every mutation it merge-writes all
//! three collections of its latest snapshot, each replaced wholesale, on its
//! own document. Viewers hold a
//! live subscription on that document and swap their projection for each
//! snapshot they receive.
//!
//! The store merges at the top level only, so two coaches writing the same
//! collection concurrently resolve as last writer wins. Nothing here detects
//! that; a finer [`MergePolicy`](matchtag_core::document::MergePolicy) is the
//! place to add it.

pub mod viewer;
pub mod wire;

pub use viewer::{ViewerAction, ViewerReducer, ViewerSession, ViewerState};
pub use wire::{decode_snapshot, decode_tags, encode_collections, encode_tag};

use crate::model::{Collections, Snapshot};
use matchtag_core::document::{DocumentError, DocumentStore};
use thiserror::Error;
use tokio::sync::Mutex;

/// Replication failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The first read of the coach's document failed; the session cannot start
    #[error("Initial fetch failed: {0}")]
    InitialFetch(String),

    /// A snapshot could not be encoded or decoded
    #[error("Snapshot encoding failed: {0}")]
    Decode(String),

    /// A merge-write was refused
    #[error("Push failed: {0}")]
    Push(String),
}

impl From<DocumentError> for SyncError {
    fn from(error: DocumentError) -> Self {
        Self::Push(error.to_string())
    }
}

/// Merge-write the touched collections of `snapshot` under `key`.
///
/// # Errors
///
/// [`SyncError::Decode`] when encoding fails and [`SyncError::Push`] when the
/// store refuses the write.
pub async fn push(
    documents: &dyn DocumentStore,
    key: &str,
    snapshot: &Snapshot,
    touched: Collections,
) -> Result<(), SyncError> {
    let patch =
        encode_collections(snapshot, touched).map_err(|e| SyncError::Decode(e.to_string()))?;
    match documents.set_merge(key, patch).await {
        Ok(()) => {
            metrics::counter!("sync.push.success").increment(1);
            Ok(())
        },
        Err(error) => {
            metrics::counter!("sync.push.failure").increment(1);
            tracing::error!(key, %error, "Push to document store failed");
            Err(error.into())
        },
    }
}

/// Orders the coach's own pushes.
///
/// Every push carries the whole snapshot of its revision. Effects run
/// concurrently, so the push for revision 7 can reach the store after the one
/// for revision 8; the sequencer writes one push at a time and skips any
/// revision older than the last one written. A failed push is repaired by the
/// next one, since that one rewrites every collection.
#[derive(Debug, Default)]
pub struct PushSequencer {
    written: Mutex<u64>,
}

impl PushSequencer {
    /// Create a sequencer with nothing written yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push every collection of `snapshot` unless a newer revision is
    /// already in the store.
    ///
    /// Returns `false` when the push was stale and nothing was sent.
    ///
    /// # Errors
    ///
    /// Same as [`push`]. A failed push leaves the written revision unchanged.
    pub async fn push(
        &self,
        documents: &dyn DocumentStore,
        key: &str,
        revision: u64,
        snapshot: &Snapshot,
    ) -> Result<bool, SyncError> {
        let mut written = self.written.lock().await;
        if *written >= revision {
            tracing::debug!(revision, written = *written, "Skipping stale push");
            return Ok(false);
        }

        push(documents, key, snapshot, Collections::ALL).await?;
        *written = revision;
        Ok(true)
    }
}
