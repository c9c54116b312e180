//! The coach's reducer.
//!
//! Every edit to the coach's data is a [`CoachAction`] reduced here. A
//! successful edit replaces the snapshot and returns one effect that pushes
//! the whole new snapshot to the document store; the effect reports back
//! with [`CoachAction::SyncSucceeded`] or [`CoachAction::SyncFailed`]. An edit
//! that names a missing record is logged and leaves the state untouched.
//!
//! Suggestion requests follow the same loop: the request goes out as an
//! effect and its outcome comes back as an action.

use crate::config::Config;
use crate::event_store::{self, Mutation, OpError};
use crate::history::merge_with_live;
use crate::model::{
    Collections, DetectedPlay, DraftId, MatchId, NewMatch, NewPlayer, NewTag, Player, PlayerId,
    Snapshot, SuggestionId, Tag, TagId, TagPatch, VideoRef,
};
use crate::suggestions::filter::screen;
use crate::suggestions::{
    FeedbackRecord, Frame, LearningContext, RawSuggestion, ReviewState, SuggestionConfig,
    SuggestionError, SuggestionRequest, SuggestionService,
};
use crate::sync::PushSequencer;
use crate::taxonomy::Action;
use matchtag_core::document::DocumentStore;
use matchtag_core::environment::{Clock, IdGenerator};
use matchtag_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use std::sync::Arc;

/// Replication bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Incremented by every edit that touched a synced collection
    pub revision: u64,
    /// Pushes started and not yet reported
    pub pending: usize,
    /// Highest revision confirmed by the store
    pub last_synced: u64,
    /// Reason of the last failed push, cleared when the latest revision lands
    pub last_error: Option<String>,
}

/// Everything the coach's store holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoachState {
    /// The authoritative snapshot
    pub snapshot: Snapshot,
    /// Tags loaded from the history table
    pub history: Vec<Tag>,
    /// Suggestions awaiting review and the feedback log
    pub review: ReviewState,
    /// Push progress
    pub sync: SyncStatus,
}

impl CoachState {
    /// Start from an existing snapshot.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Learning context over history plus live tags and the feedback log.
    #[must_use]
    pub fn learning_context(&self, config: &SuggestionConfig) -> LearningContext {
        let tags = merge_with_live(&self.history, &self.snapshot.tags);
        LearningContext::build(&tags, &self.review.feedback, config)
    }

    /// The last `limit` tags of a match, oldest first.
    #[must_use]
    pub fn recent_tags(&self, match_id: &MatchId, limit: usize) -> Vec<Tag> {
        let tags = self.snapshot.match_tags(match_id);
        let skip = tags.len().saturating_sub(limit);
        tags.into_iter().skip(skip).cloned().collect()
    }
}

/// Inputs to the coach's reducer.
#[derive(Debug, Clone)]
pub enum CoachAction {
    // Commands
    /// Bulk player import; known ids are superseded
    ImportPlayers {
        /// Players to import
        players: Vec<Player>,
    },
    /// Add one player with a fresh id
    AddPlayer(NewPlayer),
    /// Create a match with a fresh id
    CreateMatch(NewMatch),
    /// Record a tag with a fresh id
    AddTag(NewTag),
    /// Edit fields of a tag
    UpdateTag {
        /// Tag to edit
        id: TagId,
        /// Fields to change
        patch: TagPatch,
    },
    /// Remove a tag
    DeleteTag {
        /// Tag to remove
        id: TagId,
    },
    /// Store automated detections as drafts
    AddDraftPlays {
        /// Match the detections belong to
        match_id: MatchId,
        /// Detections in the order received
        plays: Vec<DetectedPlay>,
    },
    /// Promote a draft to a tag unchanged
    ConfirmDraft {
        /// Owning match
        match_id: MatchId,
        /// Draft to promote
        draft_id: DraftId,
    },
    /// Promote a draft to a tag with overrides
    EditAndConfirmDraft {
        /// Owning match
        match_id: MatchId,
        /// Draft to promote
        draft_id: DraftId,
        /// Fields replacing the draft's
        overrides: TagPatch,
    },
    /// Discard a draft
    DeleteDraft {
        /// Owning match
        match_id: MatchId,
        /// Draft to discard
        draft_id: DraftId,
    },
    /// Flip a match's finalized flag
    ToggleMatchFinalized {
        /// Match to flip
        match_id: MatchId,
    },
    /// Attach a local video; never synced
    AttachVideo {
        /// Match to attach to
        match_id: MatchId,
        /// The video
        video: VideoRef,
    },
    /// Replace the whole snapshot, as when restoring a backup
    RestoreSnapshot {
        /// The replacement
        snapshot: Snapshot,
    },
    /// Replace the loaded history
    HistoryLoaded {
        /// Every historical tag
        tags: Vec<Tag>,
    },
    /// Ask the suggestion service about a match
    RequestSuggestions {
        /// Match under review
        match_id: MatchId,
        /// Sampled video frames
        frames: Vec<Frame>,
    },
    /// Turn a proposal into a tag
    AcceptSuggestion {
        /// Proposal to accept
        id: SuggestionId,
        /// Player to credit instead of the proposed one
        player_id: Option<PlayerId>,
        /// Action to record instead of the proposed one
        action: Option<Action>,
    },
    /// Discard a proposal
    RejectSuggestion {
        /// Proposal to discard
        id: SuggestionId,
    },

    // Effect outcomes
    /// A push landed
    SyncSucceeded {
        /// Revision that was pushed
        revision: u64,
    },
    /// A push was refused
    SyncFailed {
        /// Revision that was pushed
        revision: u64,
        /// Why
        reason: String,
    },
    /// The suggestion service answered
    SuggestionsReceived {
        /// Match the request was for
        match_id: MatchId,
        /// Unscreened candidates
        raw: Vec<RawSuggestion>,
    },
    /// The suggestion service failed
    SuggestionsFailed {
        /// Why
        error: SuggestionError,
    },
}

/// Injected dependencies of the coach's reducer.
#[derive(Clone)]
pub struct CoachEnvironment {
    /// Time source for feedback records
    pub clock: Arc<dyn Clock>,
    /// Identity of new records
    pub ids: Arc<dyn IdGenerator>,
    /// Where the coach's document lives
    pub documents: Arc<dyn DocumentStore>,
    /// Source of candidate actions
    pub suggestions: Arc<dyn SuggestionService>,
    /// Runtime settings
    pub config: Config,
    sequencer: Arc<PushSequencer>,
}

impl CoachEnvironment {
    /// Bundle the dependencies. Pushes from this environment and its clones
    /// share one [`PushSequencer`].
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        documents: Arc<dyn DocumentStore>,
        suggestions: Arc<dyn SuggestionService>,
        config: Config,
    ) -> Self {
        Self {
            clock,
            ids,
            documents,
            suggestions,
            config,
            sequencer: Arc::new(PushSequencer::new()),
        }
    }
}

impl std::fmt::Debug for CoachEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachEnvironment")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Reducer for the coach's store.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoachReducer;

type Effects = SmallVec<[Effect<CoachAction>; 4]>;

impl CoachReducer {
    fn apply(
        state: &mut CoachState,
        operation: &'static str,
        result: Result<Mutation, OpError>,
        env: &CoachEnvironment,
    ) -> Effects {
        match result {
            Ok(mutation) => {
                tracing::debug!(operation, created = ?mutation.created, "Applied");
                state.snapshot = mutation.snapshot;
                Self::publish(state, mutation.touched, env)
            },
            Err(error) => {
                tracing::warn!(operation, %error, "Ignoring operation");
                SmallVec::new()
            },
        }
    }

    fn publish(state: &mut CoachState, touched: Collections, env: &CoachEnvironment) -> Effects {
        if !touched.any() {
            return SmallVec::new();
        }

        state.sync.revision += 1;
        state.sync.pending += 1;

        let revision = state.sync.revision;
        let snapshot = state.snapshot.clone();
        let documents = Arc::clone(&env.documents);
        let sequencer = Arc::clone(&env.sequencer);
        let key = env.config.coach_id.clone();

        smallvec![Effect::future(async move {
            match sequencer
                .push(documents.as_ref(), &key, revision, &snapshot)
                .await
            {
                Ok(_) => Some(CoachAction::SyncSucceeded { revision }),
                Err(error) => Some(CoachAction::SyncFailed {
                    revision,
                    reason: error.to_string(),
                }),
            }
        })]
    }

    fn request_suggestions(
        state: &mut CoachState,
        match_id: MatchId,
        frames: Vec<Frame>,
        env: &CoachEnvironment,
    ) -> Effects {
        if let Some(outstanding) = &state.review.in_flight {
            tracing::warn!(%outstanding, "Suggestion request already in flight");
            return SmallVec::new();
        }
        if state.snapshot.find_match(&match_id).is_none() {
            tracing::warn!(%match_id, "Suggestions requested for unknown match");
            return SmallVec::new();
        }

        let config = &env.config.suggestions;
        let request = SuggestionRequest {
            match_id: match_id.clone(),
            context: state.learning_context(config),
            recent_tags: state.recent_tags(&match_id, config.recent_tag_limit),
            players: state.snapshot.players.clone(),
            frames,
        };
        state.review.in_flight = Some(match_id.clone());
        state.review.last_error = None;
        metrics::counter!("suggestions.requested").increment(1);

        let service = Arc::clone(&env.suggestions);
        smallvec![Effect::future(async move {
            match service.suggest(request).await {
                Ok(raw) => Some(CoachAction::SuggestionsReceived { match_id, raw }),
                Err(error) => Some(CoachAction::SuggestionsFailed { error }),
            }
        })]
    }

    fn receive_suggestions(
        state: &mut CoachState,
        match_id: &MatchId,
        raw: Vec<RawSuggestion>,
        env: &CoachEnvironment,
    ) {
        state.review.in_flight = None;

        let config = &env.config.suggestions;
        let context = state.learning_context(config);
        let screened = {
            let existing = state.snapshot.match_tags(match_id);
            screen(raw, match_id, &existing, &context, config, env.ids.as_ref())
        };

        metrics::counter!("suggestions.kept").increment(screened.kept.len() as u64);
        metrics::counter!("suggestions.dropped").increment(screened.dropped as u64);
        tracing::info!(
            %match_id,
            kept = screened.kept.len(),
            dropped = screened.dropped,
            "Screened suggestions"
        );
        state.review.proposals.extend(screened.kept);
    }

    fn accept_suggestion(
        state: &mut CoachState,
        id: &SuggestionId,
        player_id: Option<PlayerId>,
        action: Option<Action>,
        env: &CoachEnvironment,
    ) -> Effects {
        let Some(proposal) = state.review.preview(id).cloned() else {
            tracing::warn!(%id, "Accepting unknown suggestion");
            return SmallVec::new();
        };
        let Some(player_id) = player_id.or(proposal.player_id) else {
            tracing::warn!(%id, "Accepting a suggestion needs a player");
            return SmallVec::new();
        };

        let input = NewTag {
            match_id: proposal.match_id,
            player_id,
            action: action.unwrap_or(proposal.action),
            timestamp: proposal.timestamp,
        };
        let kept_action = input.action;
        let result = event_store::add_tag(&state.snapshot, TagId::new(env.ids.next_id("tag")), input);
        if result.is_err() {
            return Self::apply(state, "accept_suggestion", result, env);
        }

        state.review.take(id);
        state.review.feedback.push(FeedbackRecord {
            suggestion_id: id.clone(),
            action: proposal.action,
            accepted: true,
            corrected_action: (kept_action != proposal.action).then_some(kept_action),
            recorded_at: env.clock.now(),
        });
        Self::apply(state, "accept_suggestion", result, env)
    }

    fn reject_suggestion(state: &mut CoachState, id: &SuggestionId, env: &CoachEnvironment) {
        let Some(proposal) = state.review.take(id) else {
            tracing::warn!(%id, "Rejecting unknown suggestion");
            return;
        };
        state.review.feedback.push(FeedbackRecord {
            suggestion_id: proposal.id,
            action: proposal.action,
            accepted: false,
            corrected_action: None,
            recorded_at: env.clock.now(),
        });
    }
}

impl Reducer for CoachReducer {
    type State = CoachState;
    type Action = CoachAction;
    type Environment = CoachEnvironment;

    fn reduce(
        &self,
        state: &mut CoachState,
        action: CoachAction,
        env: &CoachEnvironment,
    ) -> Effects {
        let snapshot = &state.snapshot;
        match action {
            CoachAction::ImportPlayers { players } => {
                let mutation = event_store::import_players(snapshot, players);
                Self::apply(state, "import_players", Ok(mutation), env)
            },
            CoachAction::AddPlayer(input) => {
                let id = PlayerId::new(env.ids.next_id("player"));
                let mutation = event_store::add_player(snapshot, id, input);
                Self::apply(state, "add_player", Ok(mutation), env)
            },
            CoachAction::CreateMatch(input) => {
                let id = MatchId::new(env.ids.next_id("match"));
                let mutation = event_store::create_match(snapshot, id, input);
                Self::apply(state, "create_match", Ok(mutation), env)
            },
            CoachAction::AddTag(input) => {
                let id = TagId::new(env.ids.next_id("tag"));
                let result = event_store::add_tag(snapshot, id, input);
                Self::apply(state, "add_tag", result, env)
            },
            CoachAction::UpdateTag { id, patch } => {
                let result = event_store::update_tag(snapshot, &id, patch);
                Self::apply(state, "update_tag", result, env)
            },
            CoachAction::DeleteTag { id } => {
                let result = event_store::delete_tag(snapshot, &id);
                Self::apply(state, "delete_tag", result, env)
            },
            CoachAction::AddDraftPlays { match_id, plays } => {
                let ids = plays
                    .iter()
                    .map(|_| DraftId::new(env.ids.next_id("draft")))
                    .collect();
                let result = event_store::add_draft_plays(snapshot, &match_id, plays, ids);
                Self::apply(state, "add_draft_plays", result, env)
            },
            CoachAction::ConfirmDraft { match_id, draft_id } => {
                let tag_id = TagId::new(env.ids.next_id("tag"));
                let result = event_store::confirm_draft(snapshot, &match_id, &draft_id, tag_id);
                Self::apply(state, "confirm_draft", result, env)
            },
            CoachAction::EditAndConfirmDraft {
                match_id,
                draft_id,
                overrides,
            } => {
                let tag_id = TagId::new(env.ids.next_id("tag"));
                let result = event_store::edit_and_confirm_draft(
                    snapshot, &match_id, &draft_id, overrides, tag_id,
                );
                Self::apply(state, "edit_and_confirm_draft", result, env)
            },
            CoachAction::DeleteDraft { match_id, draft_id } => {
                let result = event_store::delete_draft(snapshot, &match_id, &draft_id);
                Self::apply(state, "delete_draft", result, env)
            },
            CoachAction::ToggleMatchFinalized { match_id } => {
                let result = event_store::toggle_match_finalized(snapshot, &match_id);
                Self::apply(state, "toggle_match_finalized", result, env)
            },
            CoachAction::AttachVideo { match_id, video } => {
                let result = event_store::attach_video(snapshot, &match_id, video);
                Self::apply(state, "attach_video", result, env)
            },
            CoachAction::RestoreSnapshot { snapshot } => {
                tracing::info!(
                    players = snapshot.players.len(),
                    tags = snapshot.tags.len(),
                    matches = snapshot.matches.len(),
                    "Restoring snapshot"
                );
                state.snapshot = snapshot;
                Self::publish(state, Collections::ALL, env)
            },
            CoachAction::HistoryLoaded { tags } => {
                tracing::debug!(tags = tags.len(), "History replaced");
                state.history = tags;
                SmallVec::new()
            },
            CoachAction::RequestSuggestions { match_id, frames } => {
                Self::request_suggestions(state, match_id, frames, env)
            },
            CoachAction::AcceptSuggestion {
                id,
                player_id,
                action,
            } => Self::accept_suggestion(state, &id, player_id, action, env),
            CoachAction::RejectSuggestion { id } => {
                Self::reject_suggestion(state, &id, env);
                SmallVec::new()
            },
            CoachAction::SyncSucceeded { revision } => {
                state.sync.pending = state.sync.pending.saturating_sub(1);
                state.sync.last_synced = state.sync.last_synced.max(revision);
                if revision == state.sync.revision {
                    state.sync.last_error = None;
                }
                SmallVec::new()
            },
            CoachAction::SyncFailed { revision, reason } => {
                tracing::error!(revision, %reason, "Sync failed, local state kept");
                state.sync.pending = state.sync.pending.saturating_sub(1);
                if revision > state.sync.last_synced {
                    state.sync.last_error = Some(reason);
                }
                SmallVec::new()
            },
            CoachAction::SuggestionsReceived { match_id, raw } => {
                Self::receive_suggestions(state, &match_id, raw, env);
                SmallVec::new()
            },
            CoachAction::SuggestionsFailed { error } => {
                tracing::error!(%error, "Suggestion request failed");
                state.review.in_flight = None;
                state.review.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::mocks::ScriptedSuggestionService;
    use crate::suggestions::Suggestion;
    use matchtag_testing::{
        InMemoryDocumentStore, ReducerTest, SequentialIdGenerator, assertions, test_clock,
    };

    fn env() -> CoachEnvironment {
        CoachEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(SequentialIdGenerator::new()),
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(ScriptedSuggestionService::new()),
            Config::default(),
        )
    }

    fn player(id: &str) -> Player {
        Player {
            id: PlayerId::from(id),
            name: id.to_uppercase(),
            jersey_number: None,
            position: None,
        }
    }

    fn state() -> CoachState {
        let snapshot = event_store::import_players(&Snapshot::default(), vec![player("p1")]).snapshot;
        let snapshot = event_store::create_match(
            &snapshot,
            MatchId::from("m1"),
            NewMatch {
                tournament: "Liga".into(),
                category: "Sub-17".into(),
                round: 1,
                opponent: "Rival".into(),
                date: "2025-03-01".into(),
                team_name: "Club".into(),
            },
        )
        .snapshot;
        CoachState::new(snapshot)
    }

    fn proposal(id: &str, player_id: Option<&str>) -> Suggestion {
        Suggestion {
            id: SuggestionId::from(id),
            match_id: MatchId::from("m1"),
            timestamp: 42.0,
            action: Action::ShotOnTarget,
            description: "Shot from the edge of the box".into(),
            confidence: Some(0.9),
            rationale: None,
            player_id: player_id.map(PlayerId::from),
        }
    }

    fn new_tag(match_id: &str, player_id: &str) -> NewTag {
        NewTag {
            match_id: MatchId::from(match_id),
            player_id: PlayerId::from(player_id),
            action: Action::CornerKick,
            timestamp: 12.0,
        }
    }

    #[test]
    fn add_tag_replaces_snapshot_and_pushes() {
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(state())
            .when_action(CoachAction::AddTag(new_tag("m1", "p1")))
            .then_state(|s| {
                assert_eq!(s.snapshot.tags.len(), 1);
                assert_eq!(s.snapshot.tags[0].id.as_str(), "tag-1");
                assert_eq!(s.sync.revision, 1);
                assert_eq!(s.sync.pending, 1);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn tag_for_unknown_match_is_ignored() {
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(state())
            .when_action(CoachAction::AddTag(new_tag("missing", "p1")))
            .then_state(|s| {
                assert!(s.snapshot.tags.is_empty());
                assert_eq!(s.sync.revision, 0);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn empty_tag_edit_does_not_push() {
        let mut initial = state();
        initial.snapshot =
            event_store::add_tag(&initial.snapshot, TagId::from("t1"), new_tag("m1", "p1"))
                .unwrap()
                .snapshot;
        let before = initial.snapshot.clone();

        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::UpdateTag {
                id: TagId::from("t1"),
                patch: TagPatch::default(),
            })
            .then_state(move |s| {
                assert_eq!(s.snapshot, before);
                assert_eq!(s.sync.revision, 0);
                assert_eq!(s.sync.pending, 0);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn attaching_a_video_does_not_push() {
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(state())
            .when_action(CoachAction::AttachVideo {
                match_id: MatchId::from("m1"),
                video: VideoRef {
                    name: "first-half.mp4".into(),
                    source: "/videos/first-half.mp4".into(),
                },
            })
            .then_state(|s| {
                assert_eq!(s.snapshot.matches[0].videos.len(), 1);
                assert_eq!(s.sync.revision, 0);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn draft_plays_get_fresh_ids_and_confirm_into_tags() {
        let plays = vec![
            DetectedPlay {
                player_id: PlayerId::from("p1"),
                action: Action::AerialOffensiveWon,
                timestamp: 30.0,
            },
            DetectedPlay {
                player_id: PlayerId::from("p1"),
                action: Action::CornerKick,
                timestamp: 31.0,
            },
        ];
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(state())
            .when_action(CoachAction::AddDraftPlays {
                match_id: MatchId::from("m1"),
                plays,
            })
            .when_action(CoachAction::ConfirmDraft {
                match_id: MatchId::from("m1"),
                draft_id: DraftId::from("draft-1"),
            })
            .then_state(|s| {
                let drafts = &s.snapshot.matches[0].drafts;
                assert_eq!(drafts.len(), 1);
                assert_eq!(drafts[0].id.as_str(), "draft-2");
                assert_eq!(s.snapshot.tags.len(), 1);
                assert_eq!(s.snapshot.tags[0].action(), Action::AerialOffensiveWon);
                assert_eq!(s.sync.revision, 2);
            })
            .run();
    }

    #[test]
    fn sync_outcomes_settle_pending_pushes() {
        let mut initial = state();
        initial.sync = SyncStatus {
            revision: 2,
            pending: 2,
            ..SyncStatus::default()
        };
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::SyncFailed {
                revision: 1,
                reason: "offline".into(),
            })
            .when_action(CoachAction::SyncSucceeded { revision: 2 })
            .then_state(|s| {
                assert_eq!(s.sync.pending, 0);
                assert_eq!(s.sync.last_synced, 2);
                assert_eq!(s.sync.last_error, None);
            })
            .run();
    }

    #[test]
    fn failure_reported_after_a_newer_success_is_not_an_error() {
        let mut initial = state();
        initial.sync = SyncStatus {
            revision: 2,
            pending: 2,
            ..SyncStatus::default()
        };
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::SyncSucceeded { revision: 2 })
            .when_action(CoachAction::SyncFailed {
                revision: 1,
                reason: "offline".into(),
            })
            .then_state(|s| {
                assert_eq!(s.sync.pending, 0);
                assert_eq!(s.sync.last_synced, 2);
                assert_eq!(s.sync.last_error, None);
            })
            .run();
    }

    #[test]
    fn failed_push_keeps_local_state_and_records_reason() {
        let mut initial = state();
        initial.sync.revision = 1;
        initial.sync.pending = 1;
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::SyncFailed {
                revision: 1,
                reason: "write refused".into(),
            })
            .then_state(|s| {
                assert_eq!(s.snapshot.matches.len(), 1);
                assert_eq!(s.sync.last_error.as_deref(), Some("write refused"));
            })
            .run();
    }

    #[test]
    fn second_request_while_in_flight_is_ignored() {
        let mut initial = state();
        initial.review.in_flight = Some(MatchId::from("m1"));
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::RequestSuggestions {
                match_id: MatchId::from("m1"),
                frames: Vec::new(),
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn request_marks_match_in_flight() {
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(state())
            .when_action(CoachAction::RequestSuggestions {
                match_id: MatchId::from("m1"),
                frames: Vec::new(),
            })
            .then_state(|s| assert_eq!(s.review.in_flight, Some(MatchId::from("m1"))))
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();
    }

    #[test]
    fn received_candidates_are_screened_into_proposals() {
        let mut initial = state();
        initial.review.in_flight = Some(MatchId::from("m1"));
        let raw = vec![
            RawSuggestion {
                timestamp: serde_json::json!("1:05"),
                action: "Tiro de esquina".into(),
                description: "Corner from the left".into(),
                confidence: Some(0.95),
                rationale: None,
                player_id: Some("p1".into()),
            },
            RawSuggestion {
                timestamp: serde_json::json!(70),
                action: "Saque de banda".into(),
                description: "Throw-in".into(),
                confidence: Some(0.95),
                rationale: None,
                player_id: None,
            },
        ];
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::SuggestionsReceived {
                match_id: MatchId::from("m1"),
                raw,
            })
            .then_state(|s| {
                assert!(!s.review.is_busy());
                assert_eq!(s.review.proposals.len(), 1);
                assert_eq!(s.review.proposals[0].action, Action::CornerKick);
                assert!((s.review.proposals[0].timestamp - 65.0).abs() < f64::EPSILON);
            })
            .run();
    }

    #[test]
    fn service_failure_keeps_proposals() {
        let mut initial = state();
        initial.review.in_flight = Some(MatchId::from("m1"));
        initial.review.proposals.push(proposal("s1", None));
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::SuggestionsFailed {
                error: SuggestionError::Service("timeout".into()),
            })
            .then_state(|s| {
                assert!(!s.review.is_busy());
                assert_eq!(s.review.proposals.len(), 1);
                assert_eq!(
                    s.review.last_error,
                    Some(SuggestionError::Service("timeout".into()))
                );
            })
            .run();
    }

    #[test]
    fn accepting_with_override_records_correction() {
        let mut initial = state();
        initial.review.proposals.push(proposal("s1", Some("p1")));
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::AcceptSuggestion {
                id: SuggestionId::from("s1"),
                player_id: None,
                action: Some(Action::GoalScored),
            })
            .then_state(|s| {
                assert!(s.review.proposals.is_empty());
                assert_eq!(s.snapshot.tags.len(), 1);
                assert_eq!(s.snapshot.tags[0].action(), Action::GoalScored);
                let record = &s.review.feedback[0];
                assert!(record.accepted);
                assert_eq!(record.action, Action::ShotOnTarget);
                assert_eq!(record.corrected_action, Some(Action::GoalScored));
                assert_eq!(record.recorded_at, test_clock().now());
            })
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();
    }

    #[test]
    fn accepting_without_a_player_keeps_the_proposal() {
        let mut initial = state();
        initial.review.proposals.push(proposal("s1", None));
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::AcceptSuggestion {
                id: SuggestionId::from("s1"),
                player_id: None,
                action: None,
            })
            .then_state(|s| {
                assert_eq!(s.review.proposals.len(), 1);
                assert!(s.snapshot.tags.is_empty());
                assert!(s.review.feedback.is_empty());
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn accepting_twice_is_a_no_op() {
        let mut initial = state();
        initial.review.proposals.push(proposal("s1", Some("p1")));
        let accept = CoachAction::AcceptSuggestion {
            id: SuggestionId::from("s1"),
            player_id: None,
            action: None,
        };
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(accept.clone())
            .when_action(accept)
            .then_state(|s| {
                assert_eq!(s.snapshot.tags.len(), 1);
                assert_eq!(s.review.feedback.len(), 1);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn rejecting_logs_feedback() {
        let mut initial = state();
        initial.review.proposals.push(proposal("s1", None));
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(initial)
            .when_action(CoachAction::RejectSuggestion {
                id: SuggestionId::from("s1"),
            })
            .then_state(|s| {
                assert!(s.review.proposals.is_empty());
                assert!(!s.review.feedback[0].accepted);
            })
            .run();
    }

    #[test]
    fn restoring_pushes_every_collection() {
        ReducerTest::new(CoachReducer)
            .with_env(env())
            .given_state(state())
            .when_action(CoachAction::RestoreSnapshot {
                snapshot: Snapshot::default(),
            })
            .then_state(|s| {
                assert!(s.snapshot.matches.is_empty());
                assert_eq!(s.sync.revision, 1);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn recent_tags_keep_the_latest() {
        let mut s = state();
        for at in [5.0, 1.0, 3.0] {
            let tag_id = TagId::new(format!("t{at}"));
            let mut input = new_tag("m1", "p1");
            input.timestamp = at;
            s.snapshot = event_store::add_tag(&s.snapshot, tag_id, input).unwrap().snapshot;
        }
        let recent = s.recent_tags(&MatchId::from("m1"), 2);
        let times: Vec<f64> = recent.iter().map(|t| t.timestamp).collect();
        assert_eq!(times, [3.0, 5.0]);
    }
}
