//! Ergonomic testing utilities for reducers
//!
//! A fluent Given-When-Then API over a single reducer call, or over a short
//! sequence of actions when a scenario needs setup steps.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use matchtag_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use matchtag_testing::ReducerTest;
///
/// ReducerTest::new(CoachReducer)
///     .with_env(test_environment())
///     .given_state(state_with_one_match())
///     .when_action(CoachAction::ToggleMatchFinalized { match_id })
///     .then_state(|state| assert!(state.snapshot.matches[0].finalized))
///     .then_effects(|effects| assertions::assert_has_future_effect(effects))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reduce (When)
    ///
    /// Calling this more than once reduces the actions in order. Effect
    /// assertions only see the effects of the last action.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use matchtag_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect would do something when executed.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        fn has_future<A>(effect: &Effect<A>) -> bool {
            match effect {
                Effect::Future(_) => true,
                Effect::Parallel(inner) => inner.iter().any(has_future),
                Effect::None => false,
            }
        }

        assert!(
            effects.iter().any(has_future),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matchtag_core::effect::Effect;
    use matchtag_core::reducer::Reducer;
    use matchtag_core::{SmallVec, smallvec};

    #[derive(Clone, Debug)]
    struct TallyState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TallyAction {
        Increment,
        Decrement,
        Flush,
    }

    struct TallyReducer;

    struct TallyEnv;

    impl Reducer for TallyReducer {
        type State = TallyState;
        type Action = TallyAction;
        type Environment = TallyEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TallyAction::Increment => {
                    state.count += 1;
                    smallvec![Effect::None]
                },
                TallyAction::Decrement => {
                    state.count -= 1;
                    SmallVec::new()
                },
                TallyAction::Flush => smallvec![Effect::future(async { None })],
            }
        }
    }

    #[test]
    fn single_action_updates_state() {
        ReducerTest::new(TallyReducer)
            .with_env(TallyEnv)
            .given_state(TallyState { count: 0 })
            .when_action(TallyAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn action_sequence_reports_last_effects() {
        ReducerTest::new(TallyReducer)
            .with_env(TallyEnv)
            .given_state(TallyState { count: 5 })
            .when_action(TallyAction::Decrement)
            .when_action(TallyAction::Decrement)
            .when_action(TallyAction::Flush)
            .then_state(|state| {
                assert_eq!(state.count, 3);
            })
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .run();
    }

    #[test]
    fn effect_count_assertions() {
        assertions::assert_effects_count(&[Effect::<TallyAction>::None], 1);
        assertions::assert_effects_count::<TallyAction>(&[], 0);
        assertions::assert_has_future_effect(&[Effect::<TallyAction>::merge(vec![
            Effect::future(async { None }),
        ])]);
    }
}
