//! The coach's session: the only place the coach's data is edited.
//!
//! A session owns a [`Store`] running the [`CoachReducer`]. Edits return as
//! soon as the snapshot is replaced; the push to the document store runs in
//! the background and its outcome is visible through [`SyncStatus`] and
//! [`CoachSession::subscribe_notifications`].

use crate::analytics::{
    Dashboard, ExportRow, FilterOptions, Filters, Pairing, export_rows, filter_options,
    filtered_tags,
};
use crate::backup::{export_backup, import_backup};
use crate::config::Config;
use crate::error::TaggingError;
use crate::event_store::OpError;
use crate::history::{archive_tags, load_possession_events, load_tags};
use crate::model::{
    Collections, DetectedPlay, DraftId, MatchId, NewMatch, NewPlayer, NewTag, Player, PlayerId,
    Snapshot, SuggestionId, Tag, TagId, TagPatch, VideoRef,
};
use crate::reducer::{CoachAction, CoachEnvironment, CoachReducer, CoachState, SyncStatus};
use crate::suggestions::{
    FeedbackStats, Frame, LearningContext, Suggestion, SuggestionError, feedback_stats,
};
use crate::sync::{SyncError, decode_snapshot, push};
use crate::taxonomy::Action;
use matchtag_core::table::EventTable;
use matchtag_runtime::{EffectHandle, Store};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};

type CoachStore = Store<CoachState, CoachAction, CoachEnvironment, CoachReducer>;

/// A connected coach.
pub struct CoachSession {
    store: CoachStore,
    config: Config,
    request_gate: Mutex<()>,
}

impl CoachSession {
    /// Load the coach's document, creating an empty one when there is none.
    ///
    /// # Errors
    ///
    /// [`SyncError::InitialFetch`] when the document cannot be read or the
    /// empty document cannot be created.
    pub async fn connect(env: CoachEnvironment) -> Result<Self, SyncError> {
        let key = env.config.coach_id.clone();
        let snapshot = match env.documents.get(&key).await {
            Ok(Some(document)) => decode_snapshot(&document),
            Ok(None) => {
                tracing::info!(coach_id = %key, "No document yet, creating one");
                let empty = Snapshot::default();
                push(env.documents.as_ref(), &key, &empty, Collections::ALL)
                    .await
                    .map_err(|e| SyncError::InitialFetch(e.to_string()))?;
                empty
            },
            Err(error) => {
                tracing::error!(coach_id = %key, %error, "Initial fetch failed");
                return Err(SyncError::InitialFetch(error.to_string()));
            },
        };

        tracing::info!(
            coach_id = %key,
            players = snapshot.players.len(),
            tags = snapshot.tags.len(),
            matches = snapshot.matches.len(),
            "Coach connected"
        );
        if !snapshot.unrecognized.is_empty() {
            tracing::warn!(
                coach_id = %key,
                players = snapshot.unrecognized.players.len(),
                tags = snapshot.unrecognized.tags.len(),
                matches = snapshot.unrecognized.matches.len(),
                drafts = snapshot.unrecognized.drafts.len(),
                "Keeping stored records that could not be read"
            );
        }
        let config = env.config.clone();
        Ok(Self {
            store: Store::new(CoachState::new(snapshot), CoachReducer, env),
            config,
            request_gate: Mutex::new(()),
        })
    }

    async fn send(&self, action: CoachAction) -> Result<EffectHandle, TaggingError> {
        Ok(self.store.send(action).await?)
    }

    async fn ensure_open(&self, match_id: &MatchId) -> Result<(), TaggingError> {
        self.store
            .state(|s| match s.snapshot.find_match(match_id) {
                None => Err(OpError::MatchNotFound(match_id.clone()).into()),
                Some(m) if m.finalized => Err(TaggingError::MatchFinalized(match_id.clone())),
                Some(_) => Ok(()),
            })
            .await
    }

    async fn match_of_tag(&self, id: &TagId) -> Result<MatchId, TaggingError> {
        self.store
            .state(|s| s.snapshot.find_tag(id).map(|t| t.match_id.clone()))
            .await
            .ok_or_else(|| OpError::TagNotFound(id.clone()).into())
    }

    // Players and matches

    /// Bulk import players; players with a known id are superseded.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn import_players(&self, players: Vec<Player>) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::ImportPlayers { players }).await
    }

    /// Add one player.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn add_player(&self, player: NewPlayer) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::AddPlayer(player)).await
    }

    /// Create a match.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn create_match(&self, input: NewMatch) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::CreateMatch(input)).await
    }

    /// Flip a match's finalized flag.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn toggle_match_finalized(
        &self,
        match_id: MatchId,
    ) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::ToggleMatchFinalized { match_id }).await
    }

    /// Attach a local video to a match. Videos stay on this device.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn attach_video(
        &self,
        match_id: MatchId,
        video: VideoRef,
    ) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::AttachVideo { match_id, video }).await
    }

    // Tags and drafts

    /// Record a tag.
    ///
    /// # Errors
    ///
    /// [`TaggingError::MatchFinalized`] or [`TaggingError::NotFound`] for the
    /// target match.
    pub async fn add_tag(&self, input: NewTag) -> Result<EffectHandle, TaggingError> {
        self.ensure_open(&input.match_id).await?;
        self.send(CoachAction::AddTag(input)).await
    }

    /// Edit a tag.
    ///
    /// # Errors
    ///
    /// [`TaggingError::NotFound`] for an unknown tag and
    /// [`TaggingError::MatchFinalized`] when its match is finalized.
    pub async fn update_tag(&self, id: TagId, patch: TagPatch) -> Result<EffectHandle, TaggingError> {
        let match_id = self.match_of_tag(&id).await?;
        self.ensure_open(&match_id).await?;
        self.send(CoachAction::UpdateTag { id, patch }).await
    }

    /// Delete a tag.
    ///
    /// # Errors
    ///
    /// [`TaggingError::NotFound`] for an unknown tag and
    /// [`TaggingError::MatchFinalized`] when its match is finalized.
    pub async fn delete_tag(&self, id: TagId) -> Result<EffectHandle, TaggingError> {
        let match_id = self.match_of_tag(&id).await?;
        self.ensure_open(&match_id).await?;
        self.send(CoachAction::DeleteTag { id }).await
    }

    /// Store automated detections as drafts awaiting review.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn add_draft_plays(
        &self,
        match_id: MatchId,
        plays: Vec<DetectedPlay>,
    ) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::AddDraftPlays { match_id, plays }).await
    }

    /// Promote a draft to a tag unchanged.
    ///
    /// # Errors
    ///
    /// [`TaggingError::MatchFinalized`] or [`TaggingError::NotFound`] for the
    /// owning match.
    pub async fn confirm_draft(
        &self,
        match_id: MatchId,
        draft_id: DraftId,
    ) -> Result<EffectHandle, TaggingError> {
        self.ensure_open(&match_id).await?;
        self.send(CoachAction::ConfirmDraft { match_id, draft_id }).await
    }

    /// Promote a draft to a tag after applying overrides.
    ///
    /// # Errors
    ///
    /// [`TaggingError::MatchFinalized`] or [`TaggingError::NotFound`] for the
    /// owning match.
    pub async fn edit_and_confirm_draft(
        &self,
        match_id: MatchId,
        draft_id: DraftId,
        overrides: TagPatch,
    ) -> Result<EffectHandle, TaggingError> {
        self.ensure_open(&match_id).await?;
        self.send(CoachAction::EditAndConfirmDraft {
            match_id,
            draft_id,
            overrides,
        })
        .await
    }

    /// Discard a draft.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn delete_draft(
        &self,
        match_id: MatchId,
        draft_id: DraftId,
    ) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::DeleteDraft { match_id, draft_id }).await
    }

    // Suggestions

    /// Ask for suggestions on a match and wait for the screened result.
    ///
    /// Returns the proposals this request added. They also stay in the review
    /// list until accepted or rejected.
    ///
    /// # Errors
    ///
    /// [`SuggestionError::Busy`] while another request is outstanding,
    /// [`TaggingError::NotFound`] for an unknown match, and the service's own
    /// error when it fails. A failure leaves earlier proposals untouched.
    pub async fn request_suggestions(
        &self,
        match_id: MatchId,
        frames: Vec<Frame>,
    ) -> Result<Vec<Suggestion>, TaggingError> {
        let Ok(_gate) = self.request_gate.try_lock() else {
            return Err(SuggestionError::Busy.into());
        };

        let (busy, known, before) = self
            .store
            .state(|s| {
                let before: HashSet<SuggestionId> =
                    s.review.proposals.iter().map(|p| p.id.clone()).collect();
                (
                    s.review.is_busy(),
                    s.snapshot.find_match(&match_id).is_some(),
                    before,
                )
            })
            .await;
        if busy {
            return Err(SuggestionError::Busy.into());
        }
        if !known {
            return Err(OpError::MatchNotFound(match_id).into());
        }

        let mut handle = self
            .send(CoachAction::RequestSuggestions { match_id, frames })
            .await?;
        handle.wait().await;

        self.store
            .state(|s| match &s.review.last_error {
                Some(error) => Err(error.clone().into()),
                None => Ok(s
                    .review
                    .proposals
                    .iter()
                    .filter(|p| !before.contains(&p.id))
                    .cloned()
                    .collect()),
            })
            .await
    }

    /// Turn a proposal into a tag, optionally correcting its player or action.
    ///
    /// Accepting an id that is no longer pending does nothing.
    ///
    /// # Errors
    ///
    /// [`TaggingError::MatchFinalized`] when the proposal's match is finalized.
    pub async fn accept_suggestion(
        &self,
        id: SuggestionId,
        player_id: Option<PlayerId>,
        action: Option<Action>,
    ) -> Result<EffectHandle, TaggingError> {
        if let Some(proposal) = self.preview(&id).await {
            self.ensure_open(&proposal.match_id).await?;
        }
        self.send(CoachAction::AcceptSuggestion {
            id,
            player_id,
            action,
        })
        .await
    }

    /// Discard a proposal.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when the session is shutting down.
    pub async fn reject_suggestion(&self, id: SuggestionId) -> Result<EffectHandle, TaggingError> {
        self.send(CoachAction::RejectSuggestion { id }).await
    }

    /// Proposals awaiting review.
    pub async fn proposals(&self) -> Vec<Suggestion> {
        self.store.state(|s| s.review.proposals.clone()).await
    }

    /// One proposal, without changing anything.
    pub async fn preview(&self, id: &SuggestionId) -> Option<Suggestion> {
        self.store.state(|s| s.review.preview(id).cloned()).await
    }

    /// The learning context the next request would carry.
    pub async fn build_context(&self) -> LearningContext {
        let config = &self.config.suggestions;
        self.store.state(|s| s.learning_context(config)).await
    }

    /// Totals over every review decision.
    pub async fn feedback_stats(&self) -> FeedbackStats {
        self.store.state(|s| feedback_stats(&s.review.feedback)).await
    }

    // History

    /// Load every historical tag of `table` into the learning context.
    ///
    /// Returns the number of tags loaded.
    ///
    /// # Errors
    ///
    /// [`TaggingError::History`] when a page cannot be read; the previous
    /// history is kept.
    pub async fn load_history(
        &self,
        events: &dyn EventTable,
        table: &str,
    ) -> Result<usize, TaggingError> {
        let tags = load_tags(events, table, self.config.history_page_size).await?;
        let count = tags.len();
        self.send(CoachAction::HistoryLoaded { tags }).await?;
        Ok(count)
    }

    /// Copy a match's tags into `table`.
    ///
    /// # Errors
    ///
    /// [`TaggingError::NotFound`] for an unknown match and
    /// [`TaggingError::History`] when a write fails.
    pub async fn archive_match(
        &self,
        events: &dyn EventTable,
        table: &str,
        match_id: &MatchId,
    ) -> Result<usize, TaggingError> {
        let tags: Option<Vec<Tag>> = self
            .store
            .state(|s| {
                s.snapshot.find_match(match_id)?;
                Some(s.snapshot.match_tags(match_id).into_iter().cloned().collect())
            })
            .await;
        let tags = tags.ok_or_else(|| OpError::MatchNotFound(match_id.clone()))?;
        Ok(archive_tags(events, table, &tags).await?)
    }

    /// Temporal pairing over possession rows kept in `table`, placed on the
    /// current matches' rounds.
    ///
    /// # Errors
    ///
    /// [`TaggingError::History`] when a page cannot be read.
    pub async fn pairing_from_table(
        &self,
        events: &dyn EventTable,
        table: &str,
    ) -> Result<Pairing, TaggingError> {
        let config = self.config.pairing;
        let rows =
            load_possession_events(events, table, self.config.history_page_size, &config).await?;
        Ok(self
            .store
            .state(|s| Pairing::from_events(&rows, &s.snapshot.matches, &config))
            .await)
    }

    // Backup

    /// The whole snapshot as a JSON backup.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Backup`] when encoding fails.
    pub async fn export_backup(&self) -> Result<String, TaggingError> {
        Ok(self.store.state(|s| export_backup(&s.snapshot)).await?)
    }

    /// Replace the snapshot with a backup and push every collection.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Backup`] when the text is not a complete backup; the
    /// current snapshot is kept.
    pub async fn restore_backup(&self, text: &str) -> Result<EffectHandle, TaggingError> {
        let snapshot = import_backup(text)?;
        self.send(CoachAction::RestoreSnapshot { snapshot }).await
    }

    // Reads

    /// The current snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        self.store.state(|s| s.snapshot.clone()).await
    }

    /// The full state, including review and sync bookkeeping.
    pub async fn state(&self) -> CoachState {
        self.store.state(Clone::clone).await
    }

    /// Push progress.
    pub async fn sync_status(&self) -> SyncStatus {
        self.store.state(|s| s.sync.clone()).await
    }

    /// Dashboard over the current snapshot.
    pub async fn dashboard(&self, filters: &Filters) -> Dashboard {
        self.store
            .state(|s| Dashboard::build(&s.snapshot, filters))
            .await
    }

    /// Temporal pairing over the current snapshot.
    pub async fn pairing(&self, filters: &Filters) -> Pairing {
        let config = self.config.pairing;
        self.store
            .state(|s| Pairing::build(filtered_tags(&s.snapshot, filters), &s.snapshot.matches, &config))
            .await
    }

    /// Values offered by the dashboard's filter controls.
    pub async fn filter_options(&self) -> FilterOptions {
        self.store.state(|s| filter_options(&s.snapshot)).await
    }

    /// One flat row per filtered tag, for spreadsheet export.
    pub async fn export_rows(&self, filters: &Filters) -> Vec<ExportRow> {
        self.store
            .state(|s| export_rows(&s.snapshot, filtered_tags(&s.snapshot, filters)))
            .await
    }

    /// Outcomes of background work: push results and suggestion answers.
    #[must_use]
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<CoachAction> {
        self.store.subscribe_actions()
    }

    /// Stop accepting edits and wait for running pushes.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Store`] when pushes are still running at the timeout.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), TaggingError> {
        Ok(self.store.shutdown(timeout).await?)
    }
}

impl std::fmt::Debug for CoachSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachSession")
            .field("coach_id", &self.config.coach_id)
            .finish_non_exhaustive()
    }
}
