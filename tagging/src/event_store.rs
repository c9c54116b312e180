//! Operations on the coach's snapshot.
//!
//! Each operation reads the current [`Snapshot`] and returns a new one in a
//! [`Mutation`], together with the collections it replaced. The input is never
//! edited in place, so a failed operation leaves nothing half-applied.
//!
//! A finalized match is not rejected here. That rule is advisory and belongs
//! to the caller (see `CoachSession`).

use crate::model::{
    Collections, DetectedPlay, DraftId, DraftPlay, Match, MatchId, NewMatch, NewPlayer, NewTag,
    Player, PlayerId, Snapshot, Tag, TagId, TagPatch, VideoRef,
};
use thiserror::Error;

/// Sentinel category for matches without one.
pub const UNKNOWN_CATEGORY: &str = "N/A";

/// Why an operation was a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    /// No match with this id
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    /// No player with this id
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
    /// No tag with this id
    #[error("tag {0} not found")]
    TagNotFound(TagId),
    /// No draft with this id in the match
    #[error("draft {draft} not found in match {match_id}")]
    DraftNotFound {
        /// Match searched
        match_id: MatchId,
        /// Draft requested
        draft: DraftId,
    },
    /// Timestamp negative or not a number
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(String),
}

/// Result of a successful operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// The snapshot after the operation
    pub snapshot: Snapshot,
    /// Collections replaced by the operation
    pub touched: Collections,
    /// Tag created by the operation, if any
    pub created: Option<TagId>,
}

impl Mutation {
    const fn new(snapshot: Snapshot, touched: Collections) -> Self {
        Self {
            snapshot,
            touched,
            created: None,
        }
    }
}

fn check_timestamp(timestamp: f64) -> Result<(), OpError> {
    if timestamp.is_finite() && timestamp >= 0.0 {
        Ok(())
    } else {
        Err(OpError::InvalidTimestamp(timestamp.to_string()))
    }
}

fn require_match(snapshot: &Snapshot, id: &MatchId) -> Result<(), OpError> {
    snapshot
        .find_match(id)
        .map(|_| ())
        .ok_or_else(|| OpError::MatchNotFound(id.clone()))
}

fn require_player(snapshot: &Snapshot, id: &PlayerId) -> Result<(), OpError> {
    snapshot
        .find_player(id)
        .map(|_| ())
        .ok_or_else(|| OpError::PlayerNotFound(id.clone()))
}

fn map_match(
    snapshot: &Snapshot,
    id: &MatchId,
    f: impl FnOnce(&mut Match),
) -> Result<Vec<Match>, OpError> {
    let mut matches = snapshot.matches.clone();
    let target = matches
        .iter_mut()
        .find(|m| &m.id == id)
        .ok_or_else(|| OpError::MatchNotFound(id.clone()))?;
    f(target);
    Ok(matches)
}

/// Record a new tag.
///
/// # Errors
///
/// Fails when the match or player is unknown or the timestamp is invalid.
pub fn add_tag(snapshot: &Snapshot, id: TagId, input: NewTag) -> Result<Mutation, OpError> {
    require_match(snapshot, &input.match_id)?;
    require_player(snapshot, &input.player_id)?;
    check_timestamp(input.timestamp)?;

    let tag = Tag::new(
        id.clone(),
        input.match_id,
        input.player_id,
        input.action,
        input.timestamp,
    );
    let mut tags = snapshot.tags.clone();
    tags.push(tag);

    let mut mutation = Mutation::new(
        Snapshot {
            tags,
            ..snapshot.clone()
        },
        Collections::TAGS,
    );
    mutation.created = Some(id);
    Ok(mutation)
}

/// Edit player, action or timestamp of a tag. The result follows the action.
///
/// An empty patch changes nothing and touches no collection.
///
/// # Errors
///
/// Fails when the tag or the new player is unknown or the timestamp is invalid.
pub fn update_tag(snapshot: &Snapshot, id: &TagId, patch: TagPatch) -> Result<Mutation, OpError> {
    if patch.is_empty() {
        snapshot
            .find_tag(id)
            .ok_or_else(|| OpError::TagNotFound(id.clone()))?;
        return Ok(Mutation::new(snapshot.clone(), Collections::NONE));
    }
    if let Some(player_id) = &patch.player_id {
        require_player(snapshot, player_id)?;
    }
    if let Some(timestamp) = patch.timestamp {
        check_timestamp(timestamp)?;
    }

    let mut tags = snapshot.tags.clone();
    let tag = tags
        .iter_mut()
        .find(|t| &t.id == id)
        .ok_or_else(|| OpError::TagNotFound(id.clone()))?;

    if let Some(player_id) = patch.player_id {
        tag.player_id = player_id;
    }
    if let Some(action) = patch.action {
        tag.set_action(action);
    }
    if let Some(timestamp) = patch.timestamp {
        tag.timestamp = timestamp;
    }

    Ok(Mutation::new(
        Snapshot {
            tags,
            ..snapshot.clone()
        },
        Collections::TAGS,
    ))
}

/// Remove a tag.
///
/// # Errors
///
/// Fails when the tag is unknown.
pub fn delete_tag(snapshot: &Snapshot, id: &TagId) -> Result<Mutation, OpError> {
    if snapshot.find_tag(id).is_none() {
        return Err(OpError::TagNotFound(id.clone()));
    }
    let tags = snapshot
        .tags
        .iter()
        .filter(|t| &t.id != id)
        .cloned()
        .collect();

    Ok(Mutation::new(
        Snapshot {
            tags,
            ..snapshot.clone()
        },
        Collections::TAGS,
    ))
}

/// Append a batch of detections to a match's drafts. `ids` pairs with `plays`.
///
/// Detections with an invalid timestamp are skipped.
///
/// # Errors
///
/// Fails when the match is unknown.
pub fn add_draft_plays(
    snapshot: &Snapshot,
    match_id: &MatchId,
    plays: Vec<DetectedPlay>,
    ids: Vec<DraftId>,
) -> Result<Mutation, OpError> {
    let drafts: Vec<DraftPlay> = plays
        .into_iter()
        .zip(ids)
        .filter(|(play, _)| check_timestamp(play.timestamp).is_ok())
        .map(|(play, id)| DraftPlay {
            id,
            player_id: play.player_id,
            action: play.action,
            timestamp: play.timestamp,
        })
        .collect();

    let matches = map_match(snapshot, match_id, |m| m.drafts.extend(drafts))?;
    Ok(Mutation::new(
        Snapshot {
            matches,
            ..snapshot.clone()
        },
        Collections::MATCHES,
    ))
}

/// Promote a draft to a tag, unchanged.
///
/// # Errors
///
/// Fails when the match, draft or player is unknown.
pub fn confirm_draft(
    snapshot: &Snapshot,
    match_id: &MatchId,
    draft_id: &DraftId,
    tag_id: TagId,
) -> Result<Mutation, OpError> {
    edit_and_confirm_draft(snapshot, match_id, draft_id, TagPatch::default(), tag_id)
}

/// Apply overrides to a draft, then promote it to a tag.
///
/// The draft leaves the match's list and the tag is added in the same
/// mutation.
///
/// # Errors
///
/// Fails when the match, draft or resulting player is unknown, or an
/// overridden timestamp is invalid.
pub fn edit_and_confirm_draft(
    snapshot: &Snapshot,
    match_id: &MatchId,
    draft_id: &DraftId,
    overrides: TagPatch,
    tag_id: TagId,
) -> Result<Mutation, OpError> {
    let current = snapshot
        .find_match(match_id)
        .ok_or_else(|| OpError::MatchNotFound(match_id.clone()))?;
    let draft = current
        .drafts
        .iter()
        .find(|d| &d.id == draft_id)
        .ok_or_else(|| OpError::DraftNotFound {
            match_id: match_id.clone(),
            draft: draft_id.clone(),
        })?;

    let input = NewTag {
        match_id: match_id.clone(),
        player_id: overrides.player_id.unwrap_or_else(|| draft.player_id.clone()),
        action: overrides.action.unwrap_or(draft.action),
        timestamp: overrides.timestamp.unwrap_or(draft.timestamp),
    };
    let with_tag = add_tag(snapshot, tag_id, input)?;

    let matches = map_match(&with_tag.snapshot, match_id, |m| {
        m.drafts.retain(|d| &d.id != draft_id);
    })?;

    Ok(Mutation {
        snapshot: Snapshot {
            matches,
            ..with_tag.snapshot
        },
        touched: Collections::TAGS.union(Collections::MATCHES),
        created: with_tag.created,
    })
}

/// Discard a draft.
///
/// # Errors
///
/// Fails when the match or draft is unknown.
pub fn delete_draft(
    snapshot: &Snapshot,
    match_id: &MatchId,
    draft_id: &DraftId,
) -> Result<Mutation, OpError> {
    let mut found = false;
    let matches = map_match(snapshot, match_id, |m| {
        let before = m.drafts.len();
        m.drafts.retain(|d| &d.id != draft_id);
        found = m.drafts.len() != before;
    })?;
    if !found {
        return Err(OpError::DraftNotFound {
            match_id: match_id.clone(),
            draft: draft_id.clone(),
        });
    }

    Ok(Mutation::new(
        Snapshot {
            matches,
            ..snapshot.clone()
        },
        Collections::MATCHES,
    ))
}

/// Flip a match's finalized flag.
///
/// # Errors
///
/// Fails when the match is unknown.
pub fn toggle_match_finalized(snapshot: &Snapshot, match_id: &MatchId) -> Result<Mutation, OpError> {
    let matches = map_match(snapshot, match_id, |m| m.finalized = !m.finalized)?;
    Ok(Mutation::new(
        Snapshot {
            matches,
            ..snapshot.clone()
        },
        Collections::MATCHES,
    ))
}

/// Bulk import. Players with a known id are superseded, others appended.
#[must_use]
pub fn import_players(snapshot: &Snapshot, incoming: Vec<Player>) -> Mutation {
    let mut players = snapshot.players.clone();
    for player in incoming {
        match players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => players.push(player),
        }
    }
    Mutation::new(
        Snapshot {
            players,
            ..snapshot.clone()
        },
        Collections::PLAYERS,
    )
}

/// Add one player.
#[must_use]
pub fn add_player(snapshot: &Snapshot, id: PlayerId, input: NewPlayer) -> Mutation {
    import_players(
        snapshot,
        vec![Player {
            id,
            name: input.name,
            jersey_number: input.jersey_number,
            position: input.position,
        }],
    )
}

/// Create a match with no tags, drafts or videos.
#[must_use]
pub fn create_match(snapshot: &Snapshot, id: MatchId, input: NewMatch) -> Mutation {
    let category = if input.category.trim().is_empty() {
        UNKNOWN_CATEGORY.to_string()
    } else {
        input.category
    };
    let mut matches = snapshot.matches.clone();
    matches.push(Match {
        id,
        tournament: input.tournament,
        category,
        round: input.round,
        opponent: input.opponent,
        date: input.date,
        team_name: input.team_name,
        finalized: false,
        videos: Vec::new(),
        drafts: Vec::new(),
    });
    Mutation::new(
        Snapshot {
            matches,
            ..snapshot.clone()
        },
        Collections::MATCHES,
    )
}

/// Attach a local video to a match.
///
/// Videos are never transmitted, so no collection is reported as touched.
///
/// # Errors
///
/// Fails when the match is unknown.
pub fn attach_video(snapshot: &Snapshot, match_id: &MatchId, video: VideoRef) -> Result<Mutation, OpError> {
    let matches = map_match(snapshot, match_id, |m| m.videos.push(video))?;
    Ok(Mutation::new(
        Snapshot {
            matches,
            ..snapshot.clone()
        },
        Collections::NONE,
    ))
}
