//! # Matchtag Testing
//!
//! Testing utilities for the matchtag crates.
//!
//! This crate provides:
//! - Deterministic implementations of the environment traits
//! - In-memory store capabilities with failure injection
//! - A Given-When-Then builder for reducers
//!
//! ## Example
//!
//! ```ignore
//! use matchtag_testing::{InMemoryDocumentStore, SequentialIdGenerator, test_clock};
//!
//! #[tokio::test]
//! async fn tagging_round_trip() {
//!     let documents = InMemoryDocumentStore::new();
//!     let session = CoachSession::connect(env_with(documents.clone())).await.unwrap();
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use matchtag_core::environment::{Clock, IdGenerator};

/// Ergonomic reducer testing
pub mod reducer_test;

/// In-memory document and table stores
pub mod store_mocks;

/// Deterministic implementations of the environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use matchtag_testing::mocks::FixedClock;
    /// use matchtag_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which never happens.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Predictable identifiers: `tag-1`, `tag-2`, `draft-3`, ...
    ///
    /// One counter is shared by all prefixes, so two ids never share a number.
    #[derive(Debug, Default)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Start counting from 1
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(0),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self, prefix: &str) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            format!("{prefix}-{n}")
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SequentialIdGenerator, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use store_mocks::{InMemoryDocumentStore, InMemoryEventTable};
