//! Flat per-tag rows for an external table writer.

use crate::model::{Snapshot, Tag};
use serde::Serialize;

use super::time::format_clock;

/// One tag with its match and player context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    /// Tournament
    pub tournament: String,
    /// Category
    pub category: String,
    /// Round; 0 when unassigned
    pub round: u32,
    /// Opponent
    pub opponent: String,
    /// Match date
    pub date: String,
    /// Own team
    pub team: String,
    /// Player name, or the id when unknown
    pub player: String,
    /// Action label
    pub action: String,
    /// Result label
    pub result: String,
    /// Video time as `m:ss`
    pub time: String,
}

/// One row per tag, ordered by match then time.
///
/// Tags whose match is gone are skipped.
#[must_use]
pub fn export_rows<'a>(snapshot: &Snapshot, tags: impl IntoIterator<Item = &'a Tag>) -> Vec<ExportRow> {
    let mut tags: Vec<&Tag> = tags.into_iter().collect();
    tags.sort_by(|a, b| {
        a.match_id
            .cmp(&b.match_id)
            .then(a.timestamp.total_cmp(&b.timestamp))
    });

    tags.into_iter()
        .filter_map(|tag| {
            let Some(m) = snapshot.find_match(&tag.match_id) else {
                tracing::debug!(tag = %tag.id, "Skipping export of tag without match");
                return None;
            };
            Some(ExportRow {
                tournament: m.tournament.clone(),
                category: m.category.clone(),
                round: m.round,
                opponent: m.opponent.clone(),
                date: m.date.clone(),
                team: m.team_name.clone(),
                player: snapshot
                    .find_player(&tag.player_id)
                    .map_or_else(|| tag.player_id.to_string(), |p| p.name.clone()),
                action: tag.action().label().to_string(),
                result: tag.result().label().to_string(),
                time: format_clock(tag.timestamp),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Match, MatchId, Player, PlayerId, TagId};
    use crate::taxonomy::Action;

    #[test]
    fn rows_carry_match_context_and_clock_time() {
        let snapshot = Snapshot {
            players: vec![Player {
                id: PlayerId::from("p1"),
                name: "Ana".into(),
                jersey_number: None,
                position: None,
            }],
            matches: vec![Match {
                id: MatchId::from("m1"),
                tournament: "Liga".into(),
                category: "Sub-15".into(),
                round: 7,
                opponent: "Norte".into(),
                date: "2025-04-12".into(),
                team_name: "Halcones".into(),
                finalized: true,
                videos: vec![],
                drafts: vec![],
            }],
            tags: vec![
                Tag::new(TagId::from("t2"), MatchId::from("m1"), PlayerId::from("p1"), Action::GoalScored, 125.9),
                Tag::new(TagId::from("t1"), MatchId::from("m1"), PlayerId::from("p9"), Action::CornerKick, 3.0),
                Tag::new(TagId::from("t3"), MatchId::from("gone"), PlayerId::from("p1"), Action::CornerKick, 1.0),
            ],
            ..Snapshot::default()
        };

        let rows = export_rows(&snapshot, &snapshot.tags);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player, "p9");
        assert_eq!(rows[0].time, "0:03");
        assert_eq!(rows[1].player, "Ana");
        assert_eq!(rows[1].result, "Gol");
        assert_eq!(rows[1].time, "2:05");
        assert_eq!(rows[1].round, 7);
    }
}
