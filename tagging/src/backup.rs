//! Whole-snapshot backup as a JSON document.
//!
//! The backup uses the same record shape as the synced document, so video
//! references never appear in it and importing fills the same defaults.

use crate::model::{Collections, Snapshot};
use crate::sync::wire::{MATCHES_KEY, PLAYERS_KEY, TAGS_KEY, decode_snapshot, encode_collections};
use serde_json::Value;
use thiserror::Error;

/// Backup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackupError {
    /// The text is not valid JSON, or the snapshot cannot be encoded
    #[error("Backup is not valid JSON: {0}")]
    Json(String),

    /// A required top-level collection is missing or not a list
    #[error("Backup has no {0} list")]
    MissingCollection(&'static str),
}

/// Serialize every collection as pretty-printed JSON.
///
/// # Errors
///
/// [`BackupError::Json`] when encoding fails.
pub fn export_backup(snapshot: &Snapshot) -> Result<String, BackupError> {
    let document =
        encode_collections(snapshot, Collections::ALL).map_err(|e| BackupError::Json(e.to_string()))?;
    serde_json::to_string_pretty(&document).map_err(|e| BackupError::Json(e.to_string()))
}

/// Parse a backup into a complete snapshot.
///
/// All three collections must be present as lists. Records inside them are
/// decoded leniently, like a synced document.
///
/// # Errors
///
/// [`BackupError::Json`] for invalid JSON or a non-object document, and
/// [`BackupError::MissingCollection`] for a missing list.
pub fn import_backup(text: &str) -> Result<Snapshot, BackupError> {
    let value: Value = serde_json::from_str(text).map_err(|e| BackupError::Json(e.to_string()))?;
    let Value::Object(document) = value else {
        return Err(BackupError::Json("top level is not an object".to_string()));
    };

    for key in [PLAYERS_KEY, TAGS_KEY, MATCHES_KEY] {
        if !document.get(key).is_some_and(Value::is_array) {
            return Err(BackupError::MissingCollection(key));
        }
    }

    Ok(decode_snapshot(&document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Match, MatchId, Player, PlayerId, Tag, TagId, VideoRef};
    use crate::taxonomy::Action;

    fn sample() -> Snapshot {
        Snapshot {
            players: vec![Player {
                id: PlayerId::from("p1"),
                name: "Ana".into(),
                jersey_number: Some(9),
                position: Some("Delantera".into()),
            }],
            tags: vec![Tag::new(
                TagId::from("t1"),
                MatchId::from("m1"),
                PlayerId::from("p1"),
                Action::DuelOffensiveFailed,
                33.5,
            )],
            matches: vec![Match {
                id: MatchId::from("m1"),
                tournament: "Liga".into(),
                category: "Sub-13".into(),
                round: 2,
                opponent: "Sur".into(),
                date: "2025-02-02".into(),
                team_name: "Halcones".into(),
                finalized: true,
                videos: vec![VideoRef {
                    name: "v.mp4".into(),
                    source: "blob:abc".into(),
                }],
                drafts: vec![],
            }],
            ..Snapshot::default()
        }
    }

    #[test]
    fn export_then_import_reproduces_collections_without_videos() {
        let original = sample();
        let text = export_backup(&original).unwrap_or_default();
        assert!(!text.contains("blob:abc"));

        let restored = import_backup(&text);
        let mut expected = original;
        expected.matches[0].videos.clear();
        assert_eq!(restored, Ok(expected));
    }

    #[test]
    fn import_requires_every_collection() {
        assert_eq!(
            import_backup(r#"{ "players": [], "tags": [] }"#),
            Err(BackupError::MissingCollection("matches"))
        );
        assert_eq!(
            import_backup(r#"{ "players": {}, "tags": [], "matches": [] }"#),
            Err(BackupError::MissingCollection("players"))
        );
        assert!(matches!(import_backup("[1, 2"), Err(BackupError::Json(_))));
    }
}
