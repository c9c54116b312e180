//! Players, matches, tags and draft plays, plus the snapshot that holds them.

use crate::taxonomy::{Action, ResultLabel, classify};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw identifier
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of a [`Player`]
    PlayerId
);
string_id!(
    /// Identity of a [`Match`]
    MatchId
);
string_id!(
    /// Identity of a [`Tag`]
    TagId
);
string_id!(
    /// Identity of a [`DraftPlay`]
    DraftId
);
string_id!(
    /// Identity of an in-memory suggestion
    SuggestionId
);

/// A squad member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Identity
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Shirt number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jersey_number: Option<u32>,
    /// Playing position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Fields for a player created ad hoc.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPlayer {
    /// Display name
    pub name: String,
    /// Shirt number
    pub jersey_number: Option<u32>,
    /// Playing position
    pub position: Option<String>,
}

/// A locally attached video file or URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    /// File name shown to the coach
    pub name: String,
    /// Location or inline data; can be very large
    pub source: String,
}

/// A match and its per-match sub-collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Identity
    pub id: MatchId,
    /// Tournament name
    pub tournament: String,
    /// Age or league category; "N/A" when unknown
    pub category: String,
    /// Competition round ("jornada"); 0 when unassigned
    #[serde(rename = "jornada")]
    pub round: u32,
    /// Opposing team
    pub opponent: String,
    /// Match date as entered
    pub date: String,
    /// Own team name
    pub team_name: String,
    /// Whether the coach closed the match for editing
    #[serde(rename = "isFinalized")]
    pub finalized: bool,
    /// Local video references. Never serialized, so never leaves this process.
    #[serde(skip)]
    pub videos: Vec<VideoRef>,
    /// Unconfirmed detections awaiting review
    #[serde(rename = "detectedPlays")]
    pub drafts: Vec<DraftPlay>,
}

/// Fields for a new match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewMatch {
    /// Tournament name
    pub tournament: String,
    /// Category; empty means "N/A"
    pub category: String,
    /// Competition round
    pub round: u32,
    /// Opposing team
    pub opponent: String,
    /// Match date
    pub date: String,
    /// Own team name
    pub team_name: String,
}

/// A confirmed, timestamped player action.
///
/// The result is always `classify(action)`: it is computed on construction
/// and on every action change, and cannot be set directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Identity
    pub id: TagId,
    /// Owning match
    pub match_id: MatchId,
    /// Owning player
    pub player_id: PlayerId,
    action: Action,
    result: ResultLabel,
    /// Seconds from the start of the match video
    pub timestamp: f64,
}

impl Tag {
    /// Build a tag, classifying its action
    #[must_use]
    pub fn new(
        id: TagId,
        match_id: MatchId,
        player_id: PlayerId,
        action: Action,
        timestamp: f64,
    ) -> Self {
        Self {
            id,
            match_id,
            player_id,
            action,
            result: classify(action),
            timestamp,
        }
    }

    /// The tagged action
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// The derived result
    #[must_use]
    pub const fn result(&self) -> ResultLabel {
        self.result
    }

    /// Change the action and re-derive the result
    pub fn set_action(&mut self, action: Action) {
        self.action = action;
        self.result = classify(action);
    }
}

/// Fields for a directly tagged action.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTag {
    /// Owning match
    pub match_id: MatchId,
    /// Owning player
    pub player_id: PlayerId,
    /// Tagged action
    pub action: Action,
    /// Seconds from the start of the match video
    pub timestamp: f64,
}

/// Partial edit of a tag, or overrides applied when confirming a draft.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagPatch {
    /// New player
    pub player_id: Option<PlayerId>,
    /// New action; the result follows
    pub action: Option<Action>,
    /// New timestamp
    pub timestamp: Option<f64>,
}

impl TagPatch {
    /// Whether the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.player_id.is_none() && self.action.is_none() && self.timestamp.is_none()
    }
}

/// An unconfirmed detection. It has no result until confirmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPlay {
    /// Identity
    pub id: DraftId,
    /// Detected player
    pub player_id: PlayerId,
    /// Detected action
    pub action: Action,
    /// Seconds from the start of the match video
    pub timestamp: f64,
}

/// A detection handed over by the upstream detection step.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPlay {
    /// Detected player
    pub player_id: PlayerId,
    /// Detected action
    pub action: Action,
    /// Seconds from the start of the match video
    pub timestamp: f64,
}

/// The coach's full data set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    /// Squad
    pub players: Vec<Player>,
    /// Confirmed events
    pub tags: Vec<Tag>,
    /// Matches with their drafts
    pub matches: Vec<Match>,
    /// Stored records that could not be read, written back untouched
    #[serde(skip)]
    pub unrecognized: Unrecognized,
}

/// Stored records that do not fit the model, such as a tag whose action is
/// outside the taxonomy or whose time cannot be read.
///
/// They are hidden from every read and analysis but travel with the snapshot,
/// so a push of the collection they came from writes them back as stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Unrecognized {
    /// Raw player records
    pub players: Vec<Value>,
    /// Raw tag records
    pub tags: Vec<Value>,
    /// Raw match records
    pub matches: Vec<Value>,
    /// Raw draft records with the id of the match holding them
    pub drafts: Vec<(MatchId, Value)>,
}

impl Unrecognized {
    /// Whether every record was read
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
            && self.tags.is_empty()
            && self.matches.is_empty()
            && self.drafts.is_empty()
    }
}

impl Snapshot {
    /// Look up a match
    #[must_use]
    pub fn find_match(&self, id: &MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| &m.id == id)
    }

    /// Look up a player
    #[must_use]
    pub fn find_player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Look up a tag
    #[must_use]
    pub fn find_tag(&self, id: &TagId) -> Option<&Tag> {
        self.tags.iter().find(|t| &t.id == id)
    }

    /// Tags of one match, in timestamp order
    #[must_use]
    pub fn match_tags(&self, id: &MatchId) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.tags.iter().filter(|t| &t.match_id == id).collect();
        tags.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        tags
    }
}

/// Which top-level collections an operation replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Collections {
    /// Players changed
    pub players: bool,
    /// Tags changed
    pub tags: bool,
    /// Matches changed
    pub matches: bool,
}

impl Collections {
    /// Nothing changed
    pub const NONE: Self = Self {
        players: false,
        tags: false,
        matches: false,
    };
    /// Only players
    pub const PLAYERS: Self = Self {
        players: true,
        tags: false,
        matches: false,
    };
    /// Only tags
    pub const TAGS: Self = Self {
        players: false,
        tags: true,
        matches: false,
    };
    /// Only matches
    pub const MATCHES: Self = Self {
        players: false,
        tags: false,
        matches: true,
    };
    /// Everything
    pub const ALL: Self = Self {
        players: true,
        tags: true,
        matches: true,
    };

    /// Combine two change sets
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            players: self.players || other.players,
            tags: self.tags || other.tags,
            matches: self.matches || other.matches,
        }
    }

    /// Whether any collection changed
    #[must_use]
    pub const fn any(self) -> bool {
        self.players || self.tags || self.matches
    }
}
