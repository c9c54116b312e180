//! Keyed document capability with merge-writes and live change notification.
//!
//! A coach's data lives in one document keyed by the coach's identity. Writers
//! send a partial document (`set_merge`); readers either fetch it once (`get`)
//! or hold a live subscription that yields the full document after every write.
//!
//! How a partial document combines with the stored one is a [`MergePolicy`].
//! The only policy shipped is [`TopLevelReplace`]: each top-level key present in
//! the patch replaces the stored value wholesale, and absent keys are untouched.
//! Two writers racing on the same key therefore resolve as last writer wins.

use futures::Stream;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A JSON object stored under one key.
pub type Document = Map<String, Value>;

/// Errors raised by a [`DocumentStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// No document exists under the key
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached or refused the operation
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// A document could not be encoded or decoded
    #[error("Document serialization failed: {0}")]
    Serialization(String),
}

/// Stream of full documents delivered by a live subscription.
///
/// Each item is either the document as it stands after a write, or an error
/// for a single failed delivery. A failed delivery does not end the stream.
pub type DocumentStream = Pin<Box<dyn Stream<Item = Result<Document, DocumentError>> + Send>>;

/// Store capability for keyed documents.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` so the store can be shared as
/// `Arc<dyn DocumentStore>` and captured by effects.
pub trait DocumentStore: Send + Sync {
    /// Fetch the document under `key`, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Unavailable`] when the store cannot be read.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Document>, DocumentError>> + Send + '_>>;

    /// Merge `patch` into the document under `key`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Unavailable`] when the write is refused.
    fn set_merge(
        &self,
        key: &str,
        patch: Document,
    ) -> Pin<Box<dyn Future<Output = Result<(), DocumentError>> + Send + '_>>;

    /// Open a live subscription on `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Unavailable`] when the subscription cannot be opened.
    fn subscribe(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<DocumentStream, DocumentError>> + Send + '_>>;
}

/// Combines an incoming partial document with the stored one.
///
/// This is the hook for finer-grained strategies (per-item merges, a
/// conflict log) without touching writers or readers.
pub trait MergePolicy: Send + Sync {
    /// Apply `patch` onto `current`.
    fn merge(&self, current: &mut Document, patch: Document);
}

/// Last-writer-wins replacement of each top-level key.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopLevelReplace;

impl MergePolicy for TopLevelReplace {
    fn merge(&self, current: &mut Document, patch: Document) {
        for (key, value) in patch {
            current.insert(key, value);
        }
    }
}
