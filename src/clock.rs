//! Time source abstraction.
//!
//! The engine never reads wall-clock time directly; everything flows through
//! [`Clock`] so tests can drive a [`ManualClock`] deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::Timestamp;

/// Provides the current time to the settlement engine.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = chrono::Utc::now().timestamp().max(0) as u64;
        Timestamp::new(secs)
    }
}

/// Shared, settable clock for tests.
///
/// Clones observe the same underlying instant, so a test can hold one handle
/// while the hub owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start.as_secs())),
        }
    }

    pub fn set(&self, to: Timestamp) {
        self.now.store(to.as_secs(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.now.load(Ordering::SeqCst))
    }
}
