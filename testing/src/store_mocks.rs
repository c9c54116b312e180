//! In-memory store capabilities for tests
//!
//! - [`InMemoryDocumentStore`]: keyed documents with merge-writes and live
//!   subscriptions, plus failure injection
//! - [`InMemoryEventTable`]: paginated rows with a page-request counter

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use futures::StreamExt;
use matchtag_core::document::{
    Document, DocumentError, DocumentStore, DocumentStream, MergePolicy, TopLevelReplace,
};
use matchtag_core::table::{EventTable, TableError};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

type Delivery = Result<Document, DocumentError>;

#[derive(Debug, Default)]
struct Failures {
    gets: usize,
    sets: usize,
}

/// In-memory document store for fast, deterministic testing.
///
/// Writes go through a [`MergePolicy`] (top-level replace by default) and
/// every successful write is delivered to live subscribers of the key.
/// A subscription first yields the current document, if any.
///
/// # Example
///
/// ```
/// use matchtag_testing::InMemoryDocumentStore;
/// use matchtag_core::document::DocumentStore;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryDocumentStore::new();
/// let patch = json!({ "tags": [] }).as_object().cloned().unwrap_or_default();
/// store.set_merge("coach-1", patch).await?;
/// assert!(store.get("coach-1").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<String, Document>>>,
    watchers: Arc<RwLock<HashMap<String, broadcast::Sender<Delivery>>>>,
    policy: Arc<dyn MergePolicy>,
    failures: Arc<Mutex<Failures>>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    /// Create an empty store using last-writer-wins top-level merges
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(Arc::new(TopLevelReplace))
    }

    /// Create an empty store with a custom merge policy
    #[must_use]
    pub fn with_policy(policy: Arc<dyn MergePolicy>) -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            watchers: Arc::new(RwLock::new(HashMap::new())),
            policy,
            failures: Arc::new(Mutex::new(Failures::default())),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seed a document without counting it as a write
    pub fn insert(&self, key: &str, document: Document) {
        self.documents
            .write()
            .unwrap()
            .insert(key.to_string(), document);
    }

    /// Current document under `key`
    #[must_use]
    pub fn document(&self, key: &str) -> Option<Document> {
        self.documents.read().unwrap().get(key).cloned()
    }

    /// Number of successful merge-writes
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next `count` calls to `get` fail as unavailable
    pub fn fail_next_gets(&self, count: usize) {
        self.failures.lock().unwrap().gets = count;
    }

    /// Make the next `count` calls to `set_merge` fail as unavailable
    pub fn fail_next_sets(&self, count: usize) {
        self.failures.lock().unwrap().sets = count;
    }

    /// Deliver a failed update to every live subscriber of `key`
    pub fn push_delivery_error(&self, key: &str, reason: &str) {
        let _ = self
            .sender(key)
            .send(Err(DocumentError::Unavailable(reason.to_string())));
    }

    /// Number of live subscribers on `key`
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.watchers
            .read()
            .unwrap()
            .get(key)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn sender(&self, key: &str) -> broadcast::Sender<Delivery> {
        self.watchers
            .write()
            .unwrap()
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }

    fn take_failure(&self, pick: impl FnOnce(&mut Failures) -> &mut usize) -> bool {
        let mut failures = self.failures.lock().unwrap();
        let remaining = pick(&mut failures);
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Document>, DocumentError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            if self.take_failure(|f| &mut f.gets) {
                return Err(DocumentError::Unavailable(format!("get {key} refused")));
            }
            Ok(self.document(&key))
        })
    }

    fn set_merge(
        &self,
        key: &str,
        patch: Document,
    ) -> Pin<Box<dyn Future<Output = Result<(), DocumentError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            if self.take_failure(|f| &mut f.sets) {
                return Err(DocumentError::Unavailable(format!("write {key} refused")));
            }

            let merged = {
                let mut documents = self.documents.write().unwrap();
                let current = documents.entry(key.clone()).or_default();
                self.policy.merge(current, patch);
                current.clone()
            };
            self.writes.fetch_add(1, Ordering::SeqCst);

            // No subscribers is fine
            let _ = self.sender(&key).send(Ok(merged));
            Ok(())
        })
    }

    fn subscribe(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<DocumentStream, DocumentError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let receiver = self.sender(&key).subscribe();
            let current = self.document(&key).map(Ok);

            let updates = futures::stream::unfold(receiver, |mut receiver| async move {
                match receiver.recv().await {
                    Ok(delivery) => Some((delivery, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => Some((
                        Err(DocumentError::Unavailable(format!(
                            "subscriber lagged by {skipped} updates"
                        ))),
                        receiver,
                    )),
                    Err(broadcast::error::RecvError::Closed) => None,
                }
            });

            let stream: DocumentStream =
                Box::pin(futures::stream::iter(current).chain(updates));
            Ok(stream)
        })
    }
}

/// In-memory paginated tables for testing history loaders.
///
/// Rows keep insertion order. Every `fetch_page` call is counted so tests can
/// assert that a loader walked every page.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventTable {
    tables: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    page_requests: Arc<AtomicUsize>,
    failing_fetches: Arc<AtomicUsize>,
}

impl InMemoryEventTable {
    /// Create an empty set of tables
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table with rows
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        self.tables
            .write()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Number of rows in a table
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().unwrap().get(table).map_or(0, Vec::len)
    }

    /// Number of `fetch_page` calls so far
    #[must_use]
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Make the next `count` page fetches fail as unavailable
    pub fn fail_next_fetches(&self, count: usize) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }
}

impl EventTable for InMemoryEventTable {
    fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, TableError>> + Send + '_>> {
        let table = table.to_string();
        Box::pin(async move {
            self.page_requests.fetch_add(1, Ordering::SeqCst);

            let failing = self.failing_fetches.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_fetches.store(failing - 1, Ordering::SeqCst);
                return Err(TableError::Unavailable(format!("{table} unavailable")));
            }

            let tables = self.tables.read().unwrap();
            let rows = tables.get(&table).map_or(&[][..], Vec::as_slice);
            Ok(rows.iter().skip(offset).take(limit).cloned().collect())
        })
    }

    fn insert(
        &self,
        table: &str,
        row: Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), TableError>> + Send + '_>> {
        let table = table.to_string();
        Box::pin(async move {
            self.seed(&table, [row]);
            Ok(())
        })
    }

    fn delete(
        &self,
        table: &str,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, TableError>> + Send + '_>> {
        let table = table.to_string();
        let id = id.to_string();
        Box::pin(async move {
            let mut tables = self.tables.write().unwrap();
            let Some(rows) = tables.get_mut(&table) else {
                return Ok(false);
            };
            let before = rows.len();
            rows.retain(|row| row.get("id").and_then(Value::as_str) != Some(id.as_str()));
            Ok(rows.len() != before)
        })
    }
}
