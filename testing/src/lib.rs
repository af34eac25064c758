//! # VoloConnect Testing
//!
//! Testing utilities for the VoloConnect ledger.
//!
//! This crate provides:
//! - Deterministic clocks
//! - [`InMemoryLedger`], implementing every store trait
//! - [`LedgerHarness`], all services wired over one in-memory ledger
//! - proptest strategies for join/leave sequences
//!
//! ## Example
//!
//! ```
//! use voloconnect_testing::{LedgerHarness, sample_event};
//! use voloconnect_core::types::UserId;
//!
//! # async fn example() -> voloconnect_core::Result<()> {
//! let harness = LedgerHarness::new();
//! let event = harness.events.create_event(UserId::new(), sample_event(2)).await?;
//! harness.participation.join_event(event.id, UserId::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod ledger;

use chrono::{DateTime, Utc};
use voloconnect_core::environment::Clock;

pub use ledger::InMemoryLedger;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use voloconnect_testing::mocks::FixedClock;
    /// use voloconnect_core::environment::Clock;
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

    /// Clock that only moves when told to.
    ///
    /// Used where ordering by timestamp matters (joined_at, created_at).
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward by `by`.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// 2025-01-01 00:00:00 UTC.
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }
}

/// Services wired over a shared in-memory ledger.
pub mod fixtures {
    use super::mocks::{ManualClock, test_epoch};
    use super::InMemoryLedger;
    use chrono::Duration;
    use std::sync::Arc;
    use voloconnect_core::services::{EventService, ParticipationService, QueryService};
    use voloconnect_core::types::NewEvent;

    /// A valid active event one week after the test epoch.
    #[must_use]
    pub fn sample_event(capacity: u32) -> NewEvent {
        NewEvent {
            title: "Community garden planting".to_string(),
            description: "Bring gloves".to_string(),
            location: Some("Riverside park".to_string()),
            starts_at: test_epoch() + Duration::days(7),
            ends_at: Some(test_epoch() + Duration::days(7) + Duration::hours(3)),
            capacity,
            status: None,
        }
    }

    /// Every ledger service over one [`InMemoryLedger`] and one [`ManualClock`].
    #[derive(Clone)]
    pub struct LedgerHarness {
        /// Shared backing store
        pub ledger: Arc<InMemoryLedger>,
        /// Clock injected into every service
        pub clock: Arc<ManualClock>,
        /// Event CRUD
        pub events: EventService,
        /// Join/leave
        pub participation: ParticipationService,
        /// Question/answer ledger
        pub queries: QueryService,
    }

    impl LedgerHarness {
        /// Fresh ledger, clock at the test epoch.
        #[must_use]
        pub fn new() -> Self {
            let ledger = Arc::new(InMemoryLedger::new());
            let clock = Arc::new(ManualClock::new(test_epoch()));

            Self {
                events: EventService::new(ledger.clone(), clock.clone()),
                participation: ParticipationService::new(
                    ledger.clone(),
                    ledger.clone(),
                    clock.clone(),
                ),
                queries: QueryService::new(ledger.clone(), ledger.clone(), clock.clone()),
                ledger,
                clock,
            }
        }

        /// Advance the shared clock by one second.
        pub fn tick(&self) {
            self.clock.advance(Duration::seconds(1));
        }
    }

    impl Default for LedgerHarness {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step of a random join/leave workload.
    #[derive(Clone, Copy, Debug)]
    pub enum LedgerOp {
        /// Volunteer `n` tries to join
        Join(usize),
        /// Volunteer `n` tries to leave
        Leave(usize),
    }

    /// Random sequences of joins and leaves over `volunteers` distinct volunteers.
    pub fn ledger_ops(volunteers: usize, max_len: usize) -> impl Strategy<Value = Vec<LedgerOp>> {
        let op = prop_oneof![
            3 => (0..volunteers).prop_map(LedgerOp::Join),
            2 => (0..volunteers).prop_map(LedgerOp::Leave),
        ];
        proptest::collection::vec(op, 0..max_len)
    }
}

// Re-export commonly used items
pub use fixtures::{LedgerHarness, sample_event};
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(mocks::test_epoch());
        let before = clock.now();
        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(clock.now() - before, chrono::Duration::minutes(5));
    }
}
