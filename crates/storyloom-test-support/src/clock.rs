//! Test clock — deterministic `Clock` implementation for tests.

use chrono::{DateTime, Utc};
use storyloom_core::clock::Clock;

/// A clock that always returns a fixed point in time. Beat completion,
/// milestone and world-change timestamps all read from it, so assertions
/// can compare against `.0` directly.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
