//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by the dispatcher and the timeout supervisor
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: AtomicU64,
    malformed: AtomicU64,
    dispatched: AtomicU64,
    handler_failures: AtomicU64,
    evictions: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Messages parsed and appended to a session
    pub accepted: u64,
    /// Messages dropped as unparsable
    pub malformed: u64,
    /// Completed batches handed to the batch handler
    pub dispatched: u64,
    /// Batches whose handler returned an error or panicked
    pub handler_failures: u64,
    /// Incomplete batches discarded on timeout
    pub evictions: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
