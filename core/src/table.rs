//! Paginated event tables.
//!
//! Historical events are kept as rows in named tables and read back one page
//! at a time. A page shorter than the requested limit marks the end of the
//! table, so callers that need everything must keep fetching until then.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors raised by an [`EventTable`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The backing store could not be reached or refused the operation
    #[error("Table unavailable: {0}")]
    Unavailable(String),

    /// A row could not be encoded or decoded
    #[error("Row serialization failed: {0}")]
    Serialization(String),
}

/// Query, insert and delete against paginated tables.
///
/// Rows are JSON objects identified by their `"id"` field. Ordering is stable
/// across calls so that offsets address the same rows.
pub trait EventTable: Send + Sync {
    /// Fetch up to `limit` rows starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Unavailable`] when the table cannot be read.
    fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, TableError>> + Send + '_>>;

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Unavailable`] when the write is refused.
    fn insert(
        &self,
        table: &str,
        row: Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), TableError>> + Send + '_>>;

    /// Delete the row with the given id, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Unavailable`] when the delete is refused.
    fn delete(
        &self,
        table: &str,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, TableError>> + Send + '_>>;
}
