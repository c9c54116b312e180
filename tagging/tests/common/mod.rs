//! Shared setup for the session tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use matchtag::mocks::ScriptedSuggestionService;
use matchtag::{
    CoachEnvironment, CoachSession, Config, MatchId, NewMatch, NewPlayer, PlayerId, Snapshot,
};
use matchtag_testing::{InMemoryDocumentStore, SequentialIdGenerator, test_clock};
use std::sync::Arc;

pub const COACH: &str = "coach-1";

pub fn config() -> Config {
    Config {
        coach_id: COACH.to_string(),
        ..Config::default()
    }
}

pub fn environment(
    documents: &InMemoryDocumentStore,
    suggestions: &ScriptedSuggestionService,
) -> CoachEnvironment {
    CoachEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIdGenerator::new()),
        Arc::new(documents.clone()),
        Arc::new(suggestions.clone()),
        config(),
    )
}

pub async fn connect(
    documents: &InMemoryDocumentStore,
    suggestions: &ScriptedSuggestionService,
) -> CoachSession {
    CoachSession::connect(environment(documents, suggestions))
        .await
        .expect("coach should connect")
}

/// One match in round `round` and two players, with every push settled.
pub async fn seeded(session: &CoachSession, round: u32) -> (MatchId, PlayerId, PlayerId) {
    for name in ["Ana", "Bea"] {
        session
            .add_player(NewPlayer {
                name: name.to_string(),
                jersey_number: None,
                position: None,
            })
            .await
            .unwrap()
            .wait()
            .await;
    }
    session
        .create_match(NewMatch {
            tournament: "Liga".into(),
            category: "Sub-17".into(),
            round,
            opponent: "Rival".into(),
            date: "2025-03-01".into(),
            team_name: "Club".into(),
        })
        .await
        .unwrap()
        .wait()
        .await;

    let snapshot: Snapshot = session.snapshot().await;
    (
        snapshot.matches[0].id.clone(),
        snapshot.players[0].id.clone(),
        snapshot.players[1].id.clone(),
    )
}
