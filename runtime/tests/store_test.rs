//! Integration tests for the Store: effect feedback, completion handles,
//! action broadcasting and shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use matchtag_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use matchtag_runtime::{Store, StoreError};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok, assert_pending, assert_ready, task};

#[derive(Debug, Clone, PartialEq)]
enum PushAction {
    Save { value: u32 },
    Saved { value: u32 },
    SaveFailed { reason: String },
    SaveBoth { first: u32, second: u32 },
}

#[derive(Debug, Clone, Default)]
struct PushState {
    pending: u32,
    saved: Vec<u32>,
    last_error: Option<String>,
}

#[derive(Clone)]
struct PushEnvironment {
    reject_over: u32,
}

#[derive(Clone)]
struct PushReducer;

fn push(value: u32, env: &PushEnvironment) -> Effect<PushAction> {
    let reject_over = env.reject_over;
    Effect::future(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if value > reject_over {
            Some(PushAction::SaveFailed {
                reason: format!("{value} rejected"),
            })
        } else {
            Some(PushAction::Saved { value })
        }
    })
}

impl Reducer for PushReducer {
    type State = PushState;
    type Action = PushAction;
    type Environment = PushEnvironment;

    fn reduce(
        &self,
        state: &mut PushState,
        action: PushAction,
        env: &PushEnvironment,
    ) -> SmallVec<[Effect<PushAction>; 4]> {
        match action {
            PushAction::Save { value } => {
                state.pending += 1;
                smallvec![push(value, env)]
            },
            PushAction::SaveBoth { first, second } => {
                state.pending += 2;
                smallvec![Effect::merge(vec![push(first, env), push(second, env)])]
            },
            PushAction::Saved { value } => {
                state.pending -= 1;
                state.saved.push(value);
                SmallVec::new()
            },
            PushAction::SaveFailed { reason } => {
                state.pending -= 1;
                state.last_error = Some(reason);
                SmallVec::new()
            },
        }
    }
}

fn store(reject_over: u32) -> Store<PushState, PushAction, PushEnvironment, PushReducer> {
    Store::new(PushState::default(), PushReducer, PushEnvironment { reject_over })
}

#[tokio::test]
async fn waiting_on_handle_sees_feedback_action_reduced() {
    let store = store(100);

    let mut handle = assert_ok!(store.send(PushAction::Save { value: 7 }).await);
    assert_eq!(store.state(|s| s.pending).await, 1);

    {
        let mut waiting = task::spawn(handle.wait());
        assert_pending!(waiting.poll());
    }
    handle.wait().await;

    assert_eq!(store.state(|s| s.saved.clone()).await, vec![7]);
    assert_eq!(store.state(|s| s.pending).await, 0);
    assert_eq!(handle.pending(), 0);
}

#[tokio::test]
async fn parallel_effects_are_tracked_by_one_handle() {
    let store = store(100);

    let mut handle = assert_ok!(
        store
            .send(PushAction::SaveBoth { first: 1, second: 2 })
            .await
    );
    assert_ok!(handle.wait_with_timeout(Duration::from_secs(2)).await);

    let mut saved = store.state(|s| s.saved.clone()).await;
    saved.sort_unstable();
    assert_eq!(saved, vec![1, 2]);
}

#[tokio::test]
async fn failures_surface_on_the_broadcast_side_channel() {
    let store = store(10);
    let mut rx = store.subscribe_actions();

    let mut handle = assert_ok!(store.send(PushAction::Save { value: 50 }).await);
    handle.wait().await;

    let observed = assert_ok!(rx.recv().await);
    assert_eq!(
        observed,
        PushAction::SaveFailed {
            reason: "50 rejected".to_string()
        }
    );
    assert_eq!(
        store.state(|s| s.last_error.clone()).await.as_deref(),
        Some("50 rejected")
    );
}

#[tokio::test]
async fn completed_handle_returns_immediately() {
    let mut handle = matchtag_runtime::EffectHandle::completed();
    assert_ready!(task::spawn(handle.wait()).poll());
    assert_eq!(handle.pending(), 0);
}

#[tokio::test]
async fn shutdown_drains_effects_and_rejects_new_actions() {
    let store = store(100);
    let _ = assert_ok!(store.send(PushAction::Save { value: 3 }).await);

    assert_ok!(store.shutdown(Duration::from_secs(2)).await);
    assert_eq!(store.pending_effects(), 0);

    let rejected = assert_err!(store.send(PushAction::Save { value: 4 }).await);
    assert!(matches!(rejected, StoreError::ShutdownInProgress));
}
