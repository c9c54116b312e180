//! Counts and rates for the dashboards.
//!
//! Every function takes an already filtered tag list (see
//! [`super::filters::filtered_tags`]) and derives its buckets from the fixed
//! taxonomy. Tags that fit no bucket of a given chart are left out of that
//! chart only.

use crate::model::{Match, MatchId, Player, PlayerId, Snapshot, Tag};
use crate::taxonomy::{Action, Contest, Phase};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::filters::{Filters, filtered_tags};

const LEADERBOARD_SIZE: usize = 10;

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let ratio = part as f64 / whole as f64;
        ratio * 100.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Headline numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpis {
    /// Tags counted
    pub total: usize,
    /// Tags with a successful result
    pub successful: usize,
    /// `successful / total` as a percentage; 0 when empty
    pub effectiveness: f64,
}

/// Total count and effectiveness.
#[must_use]
pub fn kpis(tags: &[&Tag]) -> Kpis {
    let successful = tags.iter().filter(|t| t.result().is_success()).count();
    Kpis {
        total: tags.len(),
        successful,
        effectiveness: percent(successful, tags.len()),
    }
}

/// One bar of a contest chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContestBar {
    /// Offensive or defensive
    pub phase: Phase,
    /// Successful attempts
    pub achieved: usize,
    /// Failed attempts
    pub not_achieved: usize,
}

/// Offensive and defensive bars, in that order, for one contest family.
#[must_use]
pub fn contest_bars(tags: &[&Tag], contest: Contest) -> [ContestBar; 2] {
    let mut bars = [Phase::Offensive, Phase::Defensive].map(|phase| ContestBar {
        phase,
        achieved: 0,
        not_achieved: 0,
    });

    for tag in tags {
        let Some((family, phase)) = tag.action().contest() else {
            continue;
        };
        if family != contest {
            continue;
        }
        let bar = &mut bars[usize::from(phase == Phase::Defensive)];
        if tag.result().is_success() {
            bar.achieved += 1;
        } else {
            bar.not_achieved += 1;
        }
    }
    bars
}

/// Shots and goals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalContribution {
    /// Shots on target
    pub shots: usize,
    /// Goals scored
    pub goals: usize,
    /// `goals / shots` as a percentage; 0 without shots
    pub conversion_rate: f64,
}

fn count_action(tags: &[&Tag], action: Action) -> usize {
    tags.iter().filter(|t| t.action() == action).count()
}

/// Shots, goals and conversion rate.
#[must_use]
pub fn goal_contribution(tags: &[&Tag]) -> GoalContribution {
    let shots = count_action(tags, Action::ShotOnTarget);
    let goals = count_action(tags, Action::GoalScored);
    GoalContribution {
        shots,
        goals,
        conversion_rate: percent(goals, shots),
    }
}

/// Goalkeeper outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Goalkeeping {
    /// Saves made
    pub saves: usize,
    /// Goals conceded
    pub conceded: usize,
    /// Shots faced
    pub shots_received: usize,
}

/// Save and conceded breakdown.
#[must_use]
pub fn goalkeeping(tags: &[&Tag]) -> Goalkeeping {
    Goalkeeping {
        saves: count_action(tags, Action::SaveMade),
        conceded: count_action(tags, Action::GoalConceded),
        shots_received: count_action(tags, Action::ShotReceived),
    }
}

/// Effectiveness of one competition round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundEffectiveness {
    /// Round number
    pub round: u32,
    /// Tags in the round
    pub total: usize,
    /// Successful tags in the round
    pub successful: usize,
    /// Percentage, two decimals
    pub effectiveness: f64,
}

fn round_of<'a>(matches: &'a [Match]) -> impl Fn(&MatchId) -> Option<u32> + 'a {
    let rounds: HashMap<&MatchId, u32> = matches
        .iter()
        .filter(|m| m.round > 0)
        .map(|m| (&m.id, m.round))
        .collect();
    move |id: &MatchId| rounds.get(id).copied()
}

/// Effectiveness per round, ascending by round number.
///
/// Tags of matches without an assigned round are left out.
#[must_use]
pub fn effectiveness_by_round(tags: &[&Tag], matches: &[Match]) -> Vec<RoundEffectiveness> {
    let round_of = round_of(matches);
    let mut rounds: BTreeMap<u32, (usize, usize)> = BTreeMap::new();

    for tag in tags {
        let Some(round) = round_of(&tag.match_id) else {
            continue;
        };
        let entry = rounds.entry(round).or_default();
        entry.0 += 1;
        if tag.result().is_success() {
            entry.1 += 1;
        }
    }

    rounds
        .into_iter()
        .map(|(round, (total, successful))| RoundEffectiveness {
            round,
            total,
            successful,
            effectiveness: round2(percent(successful, total)),
        })
        .collect()
}

/// Highest and lowest effectiveness rounds.
///
/// Ties go to the earlier round.
#[must_use]
pub fn best_and_worst_round(
    series: &[RoundEffectiveness],
) -> Option<(RoundEffectiveness, RoundEffectiveness)> {
    let first = *series.first()?;
    let (best, worst) = series.iter().skip(1).fold((first, first), |(best, worst), r| {
        (
            if r.effectiveness > best.effectiveness { *r } else { best },
            if r.effectiveness < worst.effectiveness { *r } else { worst },
        )
    });
    Some((best, worst))
}

/// Per-player count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerCount {
    /// Player
    pub player_id: PlayerId,
    /// Display name, or the id when the player is unknown
    pub name: String,
    /// Occurrences
    pub count: usize,
}

fn count_by_player<'a>(
    tags: impl IntoIterator<Item = &'a Tag>,
    players: &[Player],
) -> Vec<PlayerCount> {
    let mut counts: HashMap<&PlayerId, usize> = HashMap::new();
    for tag in tags {
        *counts.entry(&tag.player_id).or_default() += 1;
    }

    let mut rows: Vec<PlayerCount> = counts
        .into_iter()
        .map(|(id, count)| PlayerCount {
            player_id: id.clone(),
            name: players
                .iter()
                .find(|p| &p.id == id)
                .map_or_else(|| id.to_string(), |p| p.name.clone()),
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Top ten players by successful attempts in one contest family.
#[must_use]
pub fn leaderboard(tags: &[&Tag], players: &[Player], contest: Contest) -> Vec<PlayerCount> {
    let mut rows = count_by_player(
        tags.iter().copied().filter(|t| {
            t.result().is_success() && t.action().contest().is_some_and(|(c, _)| c == contest)
        }),
        players,
    );
    rows.truncate(LEADERBOARD_SIZE);
    rows
}

/// Shots on target per player, most first.
#[must_use]
pub fn shots_by_player(tags: &[&Tag], players: &[Player]) -> Vec<PlayerCount> {
    count_by_player(
        tags.iter().copied().filter(|t| t.action() == Action::ShotOnTarget),
        players,
    )
}

/// Ball recoveries per player, most first.
#[must_use]
pub fn recoveries_by_player(tags: &[&Tag], players: &[Player]) -> Vec<PlayerCount> {
    count_by_player(
        tags.iter().copied().filter(|t| t.action() == Action::BallRecovery),
        players,
    )
}

/// Offensive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionSplit {
    /// Completed
    pub achieved: usize,
    /// Not completed
    pub not_achieved: usize,
}

/// Completed versus failed offensive transitions.
#[must_use]
pub fn transitions(tags: &[&Tag]) -> TransitionSplit {
    TransitionSplit {
        achieved: count_action(tags, Action::OffensiveTransitionAchieved),
        not_achieved: count_action(tags, Action::OffensiveTransitionFailed),
    }
}

/// Ball recoveries per round, ascending by round number.
#[must_use]
pub fn recoveries_by_round(tags: &[&Tag], matches: &[Match]) -> Vec<(u32, usize)> {
    let round_of = round_of(matches);
    let mut rounds: BTreeMap<u32, usize> = BTreeMap::new();
    for tag in tags.iter().filter(|t| t.action() == Action::BallRecovery) {
        if let Some(round) = round_of(&tag.match_id) {
            *rounds.entry(round).or_default() += 1;
        }
    }
    rounds.into_iter().collect()
}

/// Every dashboard series for one filter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Headline numbers
    pub kpis: Kpis,
    /// Short pass bars
    pub short_passes: [ContestBar; 2],
    /// Long pass bars
    pub long_passes: [ContestBar; 2],
    /// Duel bars
    pub duels: [ContestBar; 2],
    /// Aerial bars
    pub aerials: [ContestBar; 2],
    /// Shots and goals
    pub goals: GoalContribution,
    /// Saves and conceded
    pub goalkeeping: Goalkeeping,
    /// Effectiveness per round
    pub by_round: Vec<RoundEffectiveness>,
    /// Highest effectiveness round
    pub best_round: Option<RoundEffectiveness>,
    /// Lowest effectiveness round
    pub worst_round: Option<RoundEffectiveness>,
    /// Achieved short passes leaderboard
    pub short_pass_leaders: Vec<PlayerCount>,
    /// Achieved long passes leaderboard
    pub long_pass_leaders: Vec<PlayerCount>,
    /// Won duels leaderboard
    pub duel_leaders: Vec<PlayerCount>,
    /// Won aerials leaderboard
    pub aerial_leaders: Vec<PlayerCount>,
    /// Shots per player
    pub shots_by_player: Vec<PlayerCount>,
    /// Offensive transitions
    pub transitions: TransitionSplit,
    /// Recoveries per round
    pub recoveries_by_round: Vec<(u32, usize)>,
    /// Recoveries per player
    pub recoveries_by_player: Vec<PlayerCount>,
}

impl Dashboard {
    /// Compute every series from the current snapshot.
    #[must_use]
    pub fn build(snapshot: &Snapshot, filters: &Filters) -> Self {
        let tags = filtered_tags(snapshot, filters);
        let by_round = effectiveness_by_round(&tags, &snapshot.matches);
        let extremes = best_and_worst_round(&by_round);

        Self {
            kpis: kpis(&tags),
            short_passes: contest_bars(&tags, Contest::ShortPass),
            long_passes: contest_bars(&tags, Contest::LongPass),
            duels: contest_bars(&tags, Contest::Duel),
            aerials: contest_bars(&tags, Contest::Aerial),
            goals: goal_contribution(&tags),
            goalkeeping: goalkeeping(&tags),
            best_round: extremes.map(|(best, _)| best),
            worst_round: extremes.map(|(_, worst)| worst),
            by_round,
            short_pass_leaders: leaderboard(&tags, &snapshot.players, Contest::ShortPass),
            long_pass_leaders: leaderboard(&tags, &snapshot.players, Contest::LongPass),
            duel_leaders: leaderboard(&tags, &snapshot.players, Contest::Duel),
            aerial_leaders: leaderboard(&tags, &snapshot.players, Contest::Aerial),
            shots_by_player: shots_by_player(&tags, &snapshot.players),
            transitions: transitions(&tags),
            recoveries_by_round: recoveries_by_round(&tags, &snapshot.matches),
            recoveries_by_player: recoveries_by_player(&tags, &snapshot.players),
        }
    }
}
