//! Read-only mirrors of a coach's data.

use crate::analytics::{Dashboard, Filters, Pairing, PairingConfig};
use crate::model::Snapshot;
use futures::StreamExt;
use matchtag_core::document::DocumentStore;
use matchtag_core::effect::Effect;
use matchtag_core::reducer::Reducer;
use matchtag_core::SmallVec;
use matchtag_runtime::Store;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::SyncError;
use super::wire::decode_snapshot;

/// What a viewer holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerState {
    /// Last snapshot received
    pub projection: Snapshot,
    /// Snapshots received since connecting, the initial fetch included
    pub updates_received: u64,
    /// Last failed update, cleared by the next good one
    pub last_error: Option<String>,
}

/// Inputs to a viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerAction {
    /// A complete snapshot arrived
    SnapshotReceived(Snapshot),
    /// An update could not be delivered
    UpdateFailed(String),
}

/// Replaces the projection wholesale; keeps it on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewerReducer;

impl Reducer for ViewerReducer {
    type State = ViewerState;
    type Action = ViewerAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut ViewerState,
        action: ViewerAction,
        _env: &(),
    ) -> SmallVec<[Effect<ViewerAction>; 4]> {
        match action {
            ViewerAction::SnapshotReceived(snapshot) => {
                state.projection = snapshot;
                state.updates_received += 1;
                state.last_error = None;
                metrics::counter!("viewer.updates.received").increment(1);
            },
            ViewerAction::UpdateFailed(reason) => {
                tracing::warn!(%reason, "Live update failed, keeping last projection");
                metrics::counter!("viewer.updates.failed").increment(1);
                state.last_error = Some(reason);
            },
        }
        SmallVec::new()
    }
}

type ViewerStore = Store<ViewerState, ViewerAction, (), ViewerReducer>;

/// A live, read-only mirror of one coach's document.
///
/// There is no mutation entry point. The subscription stops when the session
/// is dropped.
pub struct ViewerSession {
    store: ViewerStore,
    changes: watch::Receiver<u64>,
    listener: JoinHandle<()>,
    pairing: PairingConfig,
}

impl ViewerSession {
    /// Fetch the coach's document and follow it.
    ///
    /// # Errors
    ///
    /// [`SyncError::InitialFetch`] when the document cannot be read, does not
    /// exist, or cannot be subscribed to. The session does not retry.
    pub async fn connect(
        documents: Arc<dyn DocumentStore>,
        coach_id: &str,
        pairing: PairingConfig,
    ) -> Result<Self, SyncError> {
        let initial = match documents.get(coach_id).await {
            Ok(Some(document)) => decode_snapshot(&document),
            Ok(None) => {
                tracing::error!(coach_id, "No document for coach");
                return Err(SyncError::InitialFetch(format!("no data for {coach_id}")));
            },
            Err(error) => {
                tracing::error!(coach_id, %error, "Initial fetch failed");
                return Err(SyncError::InitialFetch(error.to_string()));
            },
        };

        let mut updates = documents
            .subscribe(coach_id)
            .await
            .map_err(|e| SyncError::InitialFetch(e.to_string()))?;

        let store = Store::new(
            ViewerState {
                projection: initial,
                updates_received: 1,
                last_error: None,
            },
            ViewerReducer,
            (),
        );
        let (notify, changes) = watch::channel(1);

        let feed = store.clone();
        let coach = coach_id.to_string();
        let listener = tokio::spawn(async move {
            while let Some(delivery) = updates.next().await {
                let action = match delivery {
                    Ok(document) => ViewerAction::SnapshotReceived(decode_snapshot(&document)),
                    Err(error) => ViewerAction::UpdateFailed(error.to_string()),
                };
                if feed.send(action).await.is_err() {
                    break;
                }
                let seen = feed.state(|s| s.updates_received).await;
                notify.send_replace(seen);
            }
            tracing::debug!(coach_id = %coach, "Live subscription ended");
        });

        tracing::info!(coach_id, "Viewer connected");
        Ok(Self {
            store,
            changes,
            listener,
            pairing,
        })
    }

    /// The current projection.
    pub async fn snapshot(&self) -> Snapshot {
        self.store.state(|s| s.projection.clone()).await
    }

    /// Full viewer state, including the last error.
    pub async fn state(&self) -> ViewerState {
        self.store.state(Clone::clone).await
    }

    /// Dashboard over the current projection.
    pub async fn dashboard(&self, filters: &Filters) -> Dashboard {
        self.store
            .state(|s| Dashboard::build(&s.projection, filters))
            .await
    }

    /// Temporal pairing over the current projection.
    pub async fn pairing(&self, filters: &Filters) -> Pairing {
        let config = self.pairing;
        self.store
            .state(|s| {
                let tags = crate::analytics::filtered_tags(&s.projection, filters);
                Pairing::build(tags, &s.projection.matches, &config)
            })
            .await
    }

    /// Number of processed deliveries, bumped after each one is reduced.
    ///
    /// Failed deliveries leave the count unchanged but still notify.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changes.clone()
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession").finish_non_exhaustive()
    }
}
