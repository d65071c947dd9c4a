//! Grant unlock schedule.
//!
//! Nothing unlocks before the cliff. From the cliff on, the unlocked amount
//! is the share of `duration` elapsed since `start`, so the cliff releases
//! the whole backlog at once. After `start + duration` everything is
//! unlocked.

use beacon_core::error::BeaconError;
use beacon_core::types::{Amount, Timestamp};
use beacon_core::unlock::unlocked_amount;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// Largest period chrono represents as a `Duration`.
const MAX_PERIOD_SECS: u64 = (i64::MAX / 1_000) as u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSchedule {
    pub amount: Amount,
    pub start: Timestamp,
    /// Absolute time of the cliff.
    pub cliff: Timestamp,
    /// Seconds from `start` until fully unlocked.
    pub duration: u64,
}

impl GrantSchedule {
    pub fn unlocked_at(&self, now: Timestamp) -> Amount {
        unlocked_amount(self.amount, self.start, self.cliff, self.duration, now)
    }

    pub fn fully_unlocked_at(&self) -> Timestamp {
        self.start.saturating_add(self.duration)
    }

    pub fn issued_date(&self) -> Result<DateTime<Utc>, BeaconError> {
        to_datetime(self.start)
    }

    pub fn fully_unlocked_date(&self) -> Result<DateTime<Utc>, BeaconError> {
        to_datetime(self.fully_unlocked_at())
    }

    pub fn cliff_period(&self) -> Duration {
        let secs = self.cliff.saturating_sub(self.start).min(MAX_PERIOD_SECS);
        Duration::seconds(secs as i64)
    }
}

pub(crate) fn to_datetime(ts: Timestamp) -> Result<DateTime<Utc>, BeaconError> {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| BeaconError::Other(format!("timestamp {ts} out of range")))
}
