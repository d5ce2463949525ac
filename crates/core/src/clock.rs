//! Injectable time source.
//!
//! Token expiry and session liveness are evaluated against a [`Clock`]
//! rather than calling `Utc::now()` directly, so expiry boundaries can be
//! tested deterministically with [`ManualClock`].

use std::fmt::Debug;
use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::types::Timestamp;

/// A source of the current UTC time.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at the current wall-clock time, truncated to whole seconds so
    /// it lines up with JWT `iat`/`exp` resolution.
    pub fn starting_now() -> Self {
        let secs = Utc::now().timestamp();
        Self::new(chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: Timestamp) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
