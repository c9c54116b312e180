//! Dashboard filters and the value lists that populate them.

use crate::model::{Match, MatchId, Player, PlayerId, Snapshot, Tag};
use crate::taxonomy::{Action, ActionCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Narrowing applied before any aggregation. `None` means "all".
///
/// Match-level fields (tournament, category, round, team) select matches;
/// the remaining fields select tags within those matches. A match id, when
/// set, replaces the match-level selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Tournament name
    pub tournament: Option<String>,
    /// Match category
    pub category: Option<String>,
    /// Competition round
    pub round: Option<u32>,
    /// Own team name
    pub team: Option<String>,
    /// A single match
    pub match_id: Option<MatchId>,
    /// A single player
    pub player: Option<PlayerId>,
    /// A single action
    pub action: Option<Action>,
    /// One category of actions
    pub action_category: Option<ActionCategory>,
}

impl Filters {
    fn accepts_match(&self, m: &Match) -> bool {
        self.tournament.as_ref().is_none_or(|t| &m.tournament == t)
            && self.category.as_ref().is_none_or(|c| &m.category == c)
            && self.round.is_none_or(|r| m.round == r)
            && self.team.as_ref().is_none_or(|t| &m.team_name == t)
    }

    fn accepts_tag(&self, tag: &Tag) -> bool {
        self.player.as_ref().is_none_or(|p| &tag.player_id == p)
            && self.action.is_none_or(|a| tag.action() == a)
            && self
                .action_category
                .is_none_or(|c| tag.action().category() == c)
    }
}

/// Matches passing the match-level filters.
#[must_use]
pub fn filtered_matches<'a>(snapshot: &'a Snapshot, filters: &Filters) -> Vec<&'a Match> {
    snapshot
        .matches
        .iter()
        .filter(|m| filters.accepts_match(m))
        .collect()
}

/// Tags passing every filter.
#[must_use]
pub fn filtered_tags<'a>(snapshot: &'a Snapshot, filters: &Filters) -> Vec<&'a Tag> {
    let selected: BTreeSet<&MatchId> = match &filters.match_id {
        Some(id) => std::iter::once(id).collect(),
        None => filtered_matches(snapshot, filters)
            .into_iter()
            .map(|m| &m.id)
            .collect(),
    };

    snapshot
        .tags
        .iter()
        .filter(|t| selected.contains(&t.match_id) && filters.accepts_tag(t))
        .collect()
}

/// Distinct values offered by each filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    /// Tournaments, sorted
    pub tournaments: Vec<String>,
    /// Categories, sorted
    pub categories: Vec<String>,
    /// Assigned rounds, ascending
    pub rounds: Vec<u32>,
    /// Team names, sorted
    pub teams: Vec<String>,
    /// Players sorted by name
    pub players: Vec<Player>,
    /// Actions present in the tags, in taxonomy order
    pub actions: Vec<Action>,
}

fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    values
        .filter(|v| !v.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Populate the filter lists from the whole snapshot.
#[must_use]
pub fn filter_options(snapshot: &Snapshot) -> FilterOptions {
    let mut players = snapshot.players.clone();
    players.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

    FilterOptions {
        tournaments: distinct(snapshot.matches.iter().map(|m| m.tournament.clone())),
        categories: distinct(snapshot.matches.iter().map(|m| m.category.clone())),
        rounds: snapshot
            .matches
            .iter()
            .map(|m| m.round)
            .filter(|r| *r > 0)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        teams: distinct(snapshot.matches.iter().map(|m| m.team_name.clone())),
        players,
        actions: snapshot
            .tags
            .iter()
            .map(Tag::action)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    }
}
