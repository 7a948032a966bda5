//! Host clock capability
//!
//! The farm never reads wall time directly; the host hands it a `Clock` whose
//! readings must be non-decreasing across calls.

use crate::types::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current timestamp
pub trait Clock: Send + Sync {
    /// Current time in seconds. Must never go backwards between calls.
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `SystemTime`
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually driven clock for tests and scenario replay
pub struct ManualClock {
    time: parking_lot::Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            time: parking_lot::Mutex::new(start),
        }
    }

    /// Move forward by `secs` and return the new reading
    pub fn advance(&self, secs: u64) -> Timestamp {
        let mut time = self.time.lock();
        *time = time.saturating_add(secs);
        *time
    }

    /// Jump to `target`. Earlier targets are ignored so the clock stays
    /// monotonic; returns whether the clock moved.
    pub fn set(&self, target: Timestamp) -> bool {
        let mut time = self.time.lock();
        if target < *time {
            tracing::warn!("Ignoring backwards clock move from {} to {}", *time, target);
            return false;
        }
        *time = target;
        true
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.time.lock()
    }
}
