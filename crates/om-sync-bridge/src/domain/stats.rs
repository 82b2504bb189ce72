//! Bridge counters for observability.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters for the bridge.
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Inflight requests registered.
    requests_started: AtomicU64,
    /// Requests resolved with a payload.
    resolved: AtomicU64,
    /// Requests resolved with a rejection or failure.
    rejected: AtomicU64,
    /// Requests that hit their deadline.
    timed_out: AtomicU64,
    /// Requests abandoned through their caller's cancel signal.
    cancelled: AtomicU64,
    /// Resolutions dropped because the slot was consumed or the waiter gone.
    dropped_resolutions: AtomicU64,
}

impl BridgeStats {
    pub(crate) fn record_started(&self) {
        self.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_resolved(&self) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timed_out(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped_resolutions.fetch_add(1, Ordering::Relaxed);
    }

    /// A point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            requests_started: self.requests_started.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            dropped_resolutions: self.dropped_resolutions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`BridgeStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeStatsSnapshot {
    /// Inflight requests registered.
    pub requests_started: u64,
    /// Requests resolved with a payload.
    pub resolved: u64,
    /// Requests resolved with a rejection or failure.
    pub rejected: u64,
    /// Requests that hit their deadline.
    pub timed_out: u64,
    /// Requests abandoned through their caller's cancel signal.
    pub cancelled: u64,
    /// Resolutions dropped because the slot was consumed or the waiter gone.
    pub dropped_resolutions: u64,
}
