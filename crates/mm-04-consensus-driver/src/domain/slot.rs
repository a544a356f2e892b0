//! # Slot Clock
//!
//! Slot `k` covers `[genesis + k*D, genesis + (k+1)*D)`; times before genesis
//! map to negative slots. Block timestamps are whole seconds, so with
//! sub-second slots several slots share a timestamp.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotClock {
    genesis_time: u64,
    slot_time: Duration,
}

impl SlotClock {
    pub fn new(genesis_time: u64, slot_time: Duration) -> Self {
        Self {
            genesis_time,
            slot_time,
        }
    }

    pub fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    pub fn slot_time(&self) -> Duration {
        self.slot_time
    }

    /// Slot containing `unix_millis`.
    pub fn slot_at_millis(&self, unix_millis: i128) -> i64 {
        let elapsed = unix_millis - i128::from(self.genesis_time) * 1000;
        let slot_millis = self.slot_time.as_millis().max(1) as i128;
        elapsed.div_euclid(slot_millis) as i64
    }

    /// Slot containing `time`.
    pub fn slot_at(&self, time: SystemTime) -> i64 {
        self.slot_at_millis(unix_millis(time))
    }

    pub fn current_slot(&self) -> i64 {
        self.slot_at(SystemTime::now())
    }

    /// Time until the start of the slot after the one containing `time`.
    pub fn until_next_slot(&self, time: SystemTime) -> Duration {
        let now = unix_millis(time);
        let next = self.slot_at_millis(now) + 1;
        let start = i128::from(self.genesis_time) * 1000
            + i128::from(next) * self.slot_time.as_millis() as i128;
        Duration::from_millis((start - now).max(0) as u64)
    }

    /// Execution timestamp of blocks proposed in `slot`.
    pub fn slot_timestamp(&self, slot: u64) -> u64 {
        let offset = self.slot_time.as_millis().saturating_mul(u128::from(slot)) / 1000;
        self.genesis_time
            .saturating_add(u64::try_from(offset).unwrap_or(u64::MAX))
    }

    pub fn validate_timestamp(&self, timestamp: u64, slot: u64) -> Result<(), String> {
        let expected = self.slot_timestamp(slot);
        if timestamp != expected {
            return Err(format!(
                "wrong timestamp: got {timestamp}, expected {expected}"
            ));
        }
        Ok(())
    }
}

fn unix_millis(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_millis() as i128,
        Err(before) => -(before.duration().as_millis() as i128),
    }
}
