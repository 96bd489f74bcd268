//! Clock and throttling utilities.
//!
//! Interaction timestamps are wall-clock seconds since the Unix epoch,
//! as reported to the backend. The [`Clock`] trait lets the telemetry
//! runtime be driven by a [`ManualClock`] when replaying recorded
//! sessions or testing throttle behavior.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of wall-clock time in fractional seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> f64;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        let now = chrono::Utc::now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1_000_000_000.0
    }
}

/// A settable clock shared between clones.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading `secs`.
    pub fn new(secs: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(secs.to_bits())),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: f64) {
        self.bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    /// Move forward by `delta` seconds.
    pub fn advance(&self, delta: f64) {
        self.set(self.now_secs() + delta);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

/// Minimum-interval gate for backend transmissions.
///
/// A fresh throttle is always ready; after [`Throttle::mark`] it stays
/// closed until `interval_secs` have elapsed.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_secs: f64,
    last_secs: Option<f64>,
}

impl Throttle {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval_secs: interval_secs.max(0.0),
            last_secs: None,
        }
    }

    /// Whether enough time has passed since the last mark.
    pub fn is_ready(&self, now_secs: f64) -> bool {
        match self.last_secs {
            None => true,
            Some(last) => now_secs - last >= self.interval_secs,
        }
    }

    /// Record a transmission at `now_secs`.
    pub fn mark(&mut self, now_secs: f64) {
        self.last_secs = Some(now_secs);
    }

    /// Time of the last mark, if any.
    pub fn last_secs(&self) -> Option<f64> {
        self.last_secs
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }
}
