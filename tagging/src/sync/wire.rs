//! The stored shape of a coach's document and its conversion to the model.
//!
//! Stored records may be partial or written by older clients. Decoding fills
//! every default here, once, so the rest of the crate only ever sees complete
//! records:
//!
//! - a missing draft list becomes empty
//! - a missing finalized flag becomes `false`
//! - a missing category becomes `"N/A"`
//! - a missing or unparseable round becomes `0` (unassigned)
//!
//! Records that cannot be made valid (unknown action, no id, unreadable time)
//! are set aside with a warning in [`Snapshot::unrecognized`]: nothing reads
//! them, and encoding writes them back next to the records of their
//! collection so a push never erases them. A tag's stored result is ignored
//! and derived again from its action.

use crate::analytics::time::parse_seconds;
use crate::event_store::UNKNOWN_CATEGORY;
use crate::model::{
    Collections, DraftId, DraftPlay, Match, MatchId, Player, PlayerId, Snapshot, Tag, TagId,
    Unrecognized,
};
use crate::taxonomy::Action;
use matchtag_core::document::Document;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Top-level keys of a coach document.
pub const PLAYERS_KEY: &str = "players";
/// Top-level key holding tags.
pub const TAGS_KEY: &str = "tags";
/// Top-level key holding matches.
pub const MATCHES_KEY: &str = "matches";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRecord {
    id: String,
    #[serde(default, alias = "nombre")]
    name: Option<String>,
    #[serde(default, alias = "numero", alias = "number")]
    jersey_number: Option<u32>,
    #[serde(default, alias = "posicion")]
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagRecord {
    id: String,
    #[serde(alias = "match_id")]
    match_id: String,
    #[serde(alias = "player_id")]
    player_id: String,
    #[serde(alias = "accion")]
    action: String,
    #[serde(default)]
    timestamp: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftRecord {
    id: String,
    #[serde(alias = "player_id")]
    player_id: String,
    #[serde(alias = "accion")]
    action: String,
    #[serde(default)]
    timestamp: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchRecord {
    id: String,
    #[serde(default, alias = "torneo")]
    tournament: Option<String>,
    #[serde(default, alias = "categoria")]
    category: Option<String>,
    #[serde(default, rename = "jornada", alias = "round")]
    round: Value,
    #[serde(default, alias = "rival")]
    opponent: Option<String>,
    #[serde(default, alias = "fecha")]
    date: Option<String>,
    #[serde(default, alias = "nombreEquipo", alias = "team_name")]
    team_name: Option<String>,
    #[serde(default, rename = "isFinalized")]
    finalized: Option<bool>,
    #[serde(default, rename = "detectedPlays")]
    drafts: Option<Vec<Value>>,
}

fn decode_record<R: DeserializeOwned>(item: &Value, kind: &str) -> Option<R> {
    match serde_json::from_value::<R>(item.clone()) {
        Ok(record) => Some(record),
        Err(error) => {
            tracing::warn!(kind, %error, "Setting aside malformed record");
            None
        },
    }
}

/// Decode every element of a stored list, setting aside those `decode`
/// rejects.
fn decode_items<T>(
    value: Option<&Value>,
    rejected: &mut Vec<Value>,
    mut decode: impl FnMut(&Value) -> Option<T>,
) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut decoded = Vec::with_capacity(items.len());
    for item in items {
        match decode(item) {
            Some(record) => decoded.push(record),
            None => rejected.push(item.clone()),
        }
    }
    decoded
}

fn parse_round(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn parse_action(label: &str, kind: &str, id: &str) -> Option<Action> {
    match label.parse::<Action>() {
        Ok(action) => Some(action),
        Err(error) => {
            tracing::warn!(kind, id, %error, "Setting aside record outside the taxonomy");
            None
        },
    }
}

fn parse_time(value: &Value, kind: &str, id: &str) -> Option<f64> {
    let seconds = parse_seconds(value);
    if seconds.is_none() {
        tracing::warn!(kind, id, "Setting aside record without a readable timestamp");
    }
    seconds
}

impl PlayerRecord {
    fn into_player(self) -> Player {
        Player {
            id: PlayerId::new(self.id),
            name: self.name.unwrap_or_default(),
            jersey_number: self.jersey_number,
            position: self.position,
        }
    }
}

impl TagRecord {
    fn into_tag(self) -> Option<Tag> {
        let action = parse_action(&self.action, "tag", &self.id)?;
        let timestamp = parse_time(&self.timestamp, "tag", &self.id)?;
        Some(Tag::new(
            TagId::new(self.id),
            MatchId::new(self.match_id),
            PlayerId::new(self.player_id),
            action,
            timestamp,
        ))
    }
}

impl DraftRecord {
    fn into_draft(self) -> Option<DraftPlay> {
        let action = parse_action(&self.action, "draft", &self.id)?;
        let timestamp = parse_time(&self.timestamp, "draft", &self.id)?;
        Some(DraftPlay {
            id: DraftId::new(self.id),
            player_id: PlayerId::new(self.player_id),
            action,
            timestamp,
        })
    }
}

impl MatchRecord {
    fn into_match(self, rejected_drafts: &mut Vec<(MatchId, Value)>) -> Match {
        let id = MatchId::new(self.id);
        let drafts = self.drafts.map(Value::Array);
        let mut rejected = Vec::new();
        let decoded = decode_items(drafts.as_ref(), &mut rejected, |item| {
            decode_record::<DraftRecord>(item, "draft").and_then(DraftRecord::into_draft)
        });
        rejected_drafts.extend(rejected.into_iter().map(|draft| (id.clone(), draft)));

        Match {
            id,
            tournament: self.tournament.unwrap_or_default(),
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
            round: parse_round(&self.round),
            opponent: self.opponent.unwrap_or_default(),
            date: self.date.unwrap_or_default(),
            team_name: self.team_name.unwrap_or_default(),
            finalized: self.finalized.unwrap_or(false),
            videos: Vec::new(),
            drafts: decoded,
        }
    }
}

/// Build a complete snapshot from a stored document.
///
/// Missing collections decode as empty.
#[must_use]
pub fn decode_snapshot(document: &Document) -> Snapshot {
    let mut unrecognized = Unrecognized::default();
    let players = decode_items(document.get(PLAYERS_KEY), &mut unrecognized.players, |item| {
        decode_record::<PlayerRecord>(item, "player").map(PlayerRecord::into_player)
    });
    let tags = decode_items(document.get(TAGS_KEY), &mut unrecognized.tags, |item| {
        decode_record::<TagRecord>(item, "tag").and_then(TagRecord::into_tag)
    });
    let drafts = &mut unrecognized.drafts;
    let matches = decode_items(document.get(MATCHES_KEY), &mut unrecognized.matches, |item| {
        decode_record::<MatchRecord>(item, "match").map(|record| record.into_match(drafts))
    });

    Snapshot {
        players,
        tags,
        matches,
        unrecognized,
    }
}

/// Decode a list of loose tag rows, such as a page from a history table.
#[must_use]
pub fn decode_tags(rows: &[Value]) -> Vec<Tag> {
    rows.iter()
        .filter_map(|row| match serde_json::from_value::<TagRecord>(row.clone()) {
            Ok(record) => record.into_tag(),
            Err(error) => {
                tracing::warn!(%error, "Dropping malformed tag row");
                None
            },
        })
        .collect()
}

/// Encode one tag as a table row.
///
/// # Errors
///
/// Returns the serializer error if the tag cannot be encoded.
pub fn encode_tag(tag: &Tag) -> Result<Value, serde_json::Error> {
    serde_json::to_value(tag)
}

fn encode_list<T: serde::Serialize>(
    records: &[T],
    unrecognized: &[Value],
) -> Result<Value, serde_json::Error> {
    let mut items = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    items.extend(unrecognized.iter().cloned());
    Ok(Value::Array(items))
}

fn encode_matches(snapshot: &Snapshot) -> Result<Value, serde_json::Error> {
    let mut items = Vec::with_capacity(snapshot.matches.len());
    for m in &snapshot.matches {
        let mut item = serde_json::to_value(m)?;
        if let Some(Value::Array(drafts)) = item.get_mut("detectedPlays") {
            drafts.extend(
                snapshot
                    .unrecognized
                    .drafts
                    .iter()
                    .filter(|(match_id, _)| match_id == &m.id)
                    .map(|(_, draft)| draft.clone()),
            );
        }
        items.push(item);
    }
    items.extend(snapshot.unrecognized.matches.iter().cloned());
    Ok(Value::Array(items))
}

/// Encode the selected collections as a merge patch.
///
/// Video references are not part of the serialized match shape, so they are
/// never included. Set-aside records are written back after the records of
/// their collection.
///
/// # Errors
///
/// Returns the serializer error if a collection cannot be encoded.
pub fn encode_collections(
    snapshot: &Snapshot,
    collections: Collections,
) -> Result<Document, serde_json::Error> {
    let mut patch = Document::new();
    if collections.players {
        patch.insert(
            PLAYERS_KEY.to_string(),
            encode_list(&snapshot.players, &snapshot.unrecognized.players)?,
        );
    }
    if collections.tags {
        patch.insert(
            TAGS_KEY.to_string(),
            encode_list(&snapshot.tags, &snapshot.unrecognized.tags)?,
        );
    }
    if collections.matches {
        patch.insert(MATCHES_KEY.to_string(), encode_matches(snapshot)?);
    }
    Ok(patch)
}
