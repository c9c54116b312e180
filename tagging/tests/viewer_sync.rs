//! Viewers mirroring a coach through the document store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use common::{COACH, connect, seeded};
use matchtag::analytics::{Filters, PairingConfig};
use matchtag::mocks::ScriptedSuggestionService;
use matchtag::{Action, NewTag, SyncError, ViewerSession};
use matchtag_testing::InMemoryDocumentStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

async fn viewer(documents: &InMemoryDocumentStore) -> ViewerSession {
    ViewerSession::connect(Arc::new(documents.clone()), COACH, PairingConfig::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn viewer_of_unknown_coach_fails_to_connect() {
    let documents = InMemoryDocumentStore::new();
    let result =
        ViewerSession::connect(Arc::new(documents), "nobody", PairingConfig::default()).await;
    assert!(matches!(result, Err(SyncError::InitialFetch(_))));
}

#[tokio::test]
async fn unreachable_store_fails_to_connect() {
    let documents = InMemoryDocumentStore::new();
    let _coach = connect(&documents, &ScriptedSuggestionService::new()).await;
    documents.fail_next_gets(1);

    let result =
        ViewerSession::connect(Arc::new(documents), COACH, PairingConfig::default()).await;
    assert!(matches!(result, Err(SyncError::InitialFetch(_))));
}

#[tokio::test]
async fn viewer_follows_coach_edits() {
    let documents = InMemoryDocumentStore::new();
    let coach = connect(&documents, &ScriptedSuggestionService::new()).await;
    let viewer = viewer(&documents).await;
    assert!(viewer.snapshot().await.matches.is_empty());

    let (match_id, ana, _) = seeded(&coach, 1).await;
    coach
        .add_tag(NewTag {
            match_id,
            player_id: ana,
            action: Action::ShotOnTarget,
            timestamp: 33.0,
        })
        .await
        .unwrap()
        .wait()
        .await;

    let expected = coach.snapshot().await;
    eventually(|| {
        let viewer = &viewer;
        let expected = &expected;
        async move { &viewer.snapshot().await == expected }
    })
    .await;

    let dashboard = viewer.dashboard(&Filters::default()).await;
    assert_eq!(dashboard.kpis.total, 1);
    assert_eq!(dashboard.goals.shots, 1);
}

#[tokio::test]
async fn failed_delivery_keeps_the_last_projection() {
    let documents = InMemoryDocumentStore::new();
    let coach = connect(&documents, &ScriptedSuggestionService::new()).await;
    seeded(&coach, 1).await;

    let viewer = viewer(&documents).await;
    let before = viewer.snapshot().await;

    documents.push_delivery_error(COACH, "connection reset");
    eventually(|| {
        let viewer = &viewer;
        async move { viewer.state().await.last_error.is_some() }
    })
    .await;

    let state = viewer.state().await;
    assert_eq!(state.projection, before);
    assert!(state.last_error.unwrap().contains("connection reset"));
}

#[tokio::test]
async fn viewer_pairs_losses_with_recoveries() {
    let documents = InMemoryDocumentStore::new();
    let coach = connect(&documents, &ScriptedSuggestionService::new()).await;
    let (match_id, ana, bea) = seeded(&coach, 4).await;

    let plays = [
        (&ana, Action::BallLoss, 100.0),
        (&bea, Action::BallRecovery, 104.0),
        (&bea, Action::OffensiveTransitionAchieved, 110.0),
    ];
    for (player, action, timestamp) in plays {
        coach
            .add_tag(NewTag {
                match_id: match_id.clone(),
                player_id: player.clone(),
                action,
                timestamp,
            })
            .await
            .unwrap()
            .wait()
            .await;
    }

    let viewer = viewer(&documents).await;
    let pairing = viewer.pairing(&Filters::default()).await;

    assert_eq!(pairing.recoveries.len(), 1);
    assert_eq!(pairing.recoveries[0].round, 4);
    assert!((pairing.recoveries[0].duration_secs - 4.0).abs() < f64::EPSILON);
    assert_eq!(pairing.transitions.len(), 1);
    assert!((pairing.transitions[0].duration_secs - 6.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn dropping_a_viewer_ends_its_subscription() {
    let documents = InMemoryDocumentStore::new();
    let _coach = connect(&documents, &ScriptedSuggestionService::new()).await;

    let viewer = viewer(&documents).await;
    assert_eq!(documents.subscriber_count(COACH), 1);
    drop(viewer);

    eventually(|| {
        let documents = documents.clone();
        async move { documents.subscriber_count(COACH) == 0 }
    })
    .await;
}
