// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Timeout supervisor - assigns deadlines and evicts stale sessions
//!
//! On every tick, for every known session:
//! 1. `count >= 1` and no deadline: assign one (see [`DeadlineMode`]);
//! 2. deadline set and `now > deadline`: reset the session, discarding the
//!    incomplete batch without dispatching it.
//!
//! Both steps run under the session's own lock, so they cannot interleave
//! with an append or a dispatch for the same device. Reset is idempotent;
//! a batch that completed first simply leaves nothing to evict.

use crate::clock::Clock;
use crate::stats::IngestStats;
use crate::store::SessionStore;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Where a session's deadline is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadlineMode {
    /// `first_reading_at + timeout`: exact arrival-time deadlines
    #[default]
    Arrival,
    /// `now_at_first_scan + timeout`: up to one tick looser
    Scan,
}

impl FromStr for DeadlineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arrival" => Ok(Self::Arrival),
            "scan" => Ok(Self::Scan),
            other => Err(format!("unknown deadline mode '{}' (expected 'arrival' or 'scan')", other)),
        }
    }
}

/// Longest timeout window a supervisor accepts; larger values are clamped
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Supervisor tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupervisorSettings {
    /// How long an incomplete batch may wait
    pub timeout: Duration,
    /// Interval between scans
    pub tick: Duration,
    pub deadline_mode: DeadlineMode,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            tick: Duration::from_millis(250),
            deadline_mode: DeadlineMode::Arrival,
        }
    }
}

/// What a single scan did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub sessions_scanned: usize,
    pub deadlines_assigned: usize,
    pub evicted: usize,
}

struct ScanContext {
    store: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    stats: Arc<IngestStats>,
    settings: SupervisorSettings,
}

impl ScanContext {
    fn scan(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let timeout = self.settings.timeout;
        let mode = self.settings.deadline_mode;

        self.store.for_each_session(|session| {
            report.sessions_scanned += 1;
            let now = self.clock.now();

            if session.count() >= 1 && session.deadline().is_none() {
                let base = match mode {
                    DeadlineMode::Arrival => session.first_reading_at().unwrap_or(now),
                    DeadlineMode::Scan => now,
                };
                match base.checked_add(timeout) {
                    Some(deadline) => {
                        session.set_deadline(deadline);
                        report.deadlines_assigned += 1;
                        info!(
                            "Timeout initiated for device {} ({} of {} readings, {:?} window)",
                            session.key(),
                            session.count(),
                            session.limit(),
                            timeout
                        );
                    }
                    None => error!(
                        "Timeout window {:?} overflows the clock for device {}; session cannot expire",
                        timeout,
                        session.key()
                    ),
                }
            }

            if let Some(deadline) = session.deadline() {
                if now > deadline {
                    let discarded = session.count();
                    if session.reset() {
                        report.evicted += 1;
                        self.stats.record_eviction();
                        warn!(
                            "Timeout exceeded for device {}: evicted {} of {} readings",
                            session.key(),
                            discarded,
                            session.limit()
                        );
                    }
                }
            }
        });

        report
    }
}

/// Background deadline scanner
pub struct TimeoutSupervisor {
    context: Arc<ScanContext>,
    running: Arc<RwLock<bool>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl TimeoutSupervisor {
    pub fn new(store: Arc<SessionStore>, clock: Arc<dyn Clock>, settings: SupervisorSettings) -> Self {
        Self::with_stats(store, clock, settings, Arc::new(IngestStats::new()))
    }

    /// Create a supervisor that records evictions into shared counters
    pub fn with_stats(
        store: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
        settings: SupervisorSettings,
        stats: Arc<IngestStats>,
    ) -> Self {
        let mut settings = settings;
        if settings.timeout > MAX_TIMEOUT {
            warn!(
                "Session timeout {:?} exceeds the {:?} limit; clamping",
                settings.timeout, MAX_TIMEOUT
            );
            settings.timeout = MAX_TIMEOUT;
        }

        Self {
            context: Arc::new(ScanContext {
                store,
                clock,
                stats,
                settings,
            }),
            running: Arc::new(RwLock::new(false)),
            thread_handle: None,
        }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.context.settings
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Run one scan on the calling thread
    pub fn scan_once(&self) -> ScanReport {
        self.context.scan()
    }

    /// Start scanning on a background thread; no-op if already running
    pub fn start(&mut self) {
        if *self.running.read() {
            return;
        }

        *self.running.write() = true;
        let running = Arc::clone(&self.running);
        let context = Arc::clone(&self.context);
        let tick = context.settings.tick;

        let spawned = thread::Builder::new()
            .name("ripeline-timeout-supervisor".to_string())
            .spawn(move || {
                info!(
                    "Timeout supervisor started (timeout: {:?}, tick: {:?}, mode: {:?})",
                    context.settings.timeout, tick, context.settings.deadline_mode
                );

                while *running.read() {
                    thread::sleep(tick);

                    if !*running.read() {
                        break;
                    }

                    // A panicking scan must not end the loop; the next tick retries
                    if catch_unwind(AssertUnwindSafe(|| context.scan())).is_err() {
                        error!("Timeout scan panicked; continuing with the next tick");
                    }
                }

                info!("Timeout supervisor stopped");
            });

        match spawned {
            Ok(handle) => self.thread_handle = Some(handle),
            Err(e) => {
                *self.running.write() = false;
                error!("Failed to spawn timeout supervisor thread: {}", e);
            }
        }
    }

    /// Stop the background thread and wait for it to exit
    pub fn stop(&mut self) {
        *self.running.write() = false;

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimeoutSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{DeviceKey, Reading};

    fn setup(mode: DeadlineMode) -> (TimeoutSupervisor, Arc<SessionStore>, Arc<ManualClock>) {
        let store = Arc::new(SessionStore::new(3));
        let clock = Arc::new(ManualClock::new());
        let supervisor = TimeoutSupervisor::new(
            Arc::clone(&store),
            clock.clone(),
            SupervisorSettings {
                timeout: Duration::from_secs(10),
                tick: Duration::from_millis(10),
                deadline_mode: mode,
            },
        );
        (supervisor, store, clock)
    }

    fn append(store: &SessionStore, clock: &ManualClock, key: &DeviceKey) {
        store.with_session(key, |s| s.append(Reading::new(vec![1.0]), clock.now()));
    }

    #[test]
    fn test_deadline_mode_parse() {
        assert_eq!("arrival".parse::<DeadlineMode>(), Ok(DeadlineMode::Arrival));
        assert_eq!(" SCAN ".parse::<DeadlineMode>(), Ok(DeadlineMode::Scan));
        assert!("later".parse::<DeadlineMode>().is_err());
    }

    #[test]
    fn test_idle_sessions_get_no_deadline() {
        let (supervisor, store, _clock) = setup(DeadlineMode::Arrival);
        let key = DeviceKey::new("W1", "D1");
        store.with_session(&key, |_| ());

        let report = supervisor.scan_once();
        assert_eq!(report.sessions_scanned, 1);
        assert_eq!(report.deadlines_assigned, 0);
        assert_eq!(store.snapshot(&key).and_then(|s| s.deadline), None);
    }

    #[test]
    fn test_arrival_mode_uses_first_reading_time() {
        let (supervisor, store, clock) = setup(DeadlineMode::Arrival);
        let key = DeviceKey::new("W1", "D1");
        append(&store, &clock, &key);

        clock.advance(Duration::from_secs(2));
        supervisor.scan_once();

        assert_eq!(
            store.snapshot(&key).and_then(|s| s.deadline),
            Some(clock.at_secs(10.0))
        );
    }

    #[test]
    fn test_scan_mode_uses_scan_time() {
        let (supervisor, store, clock) = setup(DeadlineMode::Scan);
        let key = DeviceKey::new("W1", "D1");
        append(&store, &clock, &key);

        clock.advance(Duration::from_secs(2));
        supervisor.scan_once();

        assert_eq!(
            store.snapshot(&key).and_then(|s| s.deadline),
            Some(clock.at_secs(12.0))
        );
    }

    #[test]
    fn test_deadline_is_exclusive() {
        let (supervisor, store, clock) = setup(DeadlineMode::Arrival);
        let key = DeviceKey::new("W1", "D1");
        append(&store, &clock, &key);
        supervisor.scan_once();

        // now == deadline is not yet expired
        clock.set_elapsed(Duration::from_secs(10));
        assert_eq!(supervisor.scan_once().evicted, 0);

        clock.advance(Duration::from_millis(1));
        assert_eq!(supervisor.scan_once().evicted, 1);
        assert!(store.snapshot(&key).map(|s| s.is_empty()).unwrap_or(false));
    }

    #[test]
    fn test_eviction_counted() {
        let stats = Arc::new(IngestStats::new());
        let store = Arc::new(SessionStore::new(3));
        let clock = Arc::new(ManualClock::new());
        let supervisor = TimeoutSupervisor::with_stats(
            Arc::clone(&store),
            clock.clone(),
            SupervisorSettings::default(),
            Arc::clone(&stats),
        );

        append(&store, &clock, &DeviceKey::new("W1", "D1"));
        supervisor.scan_once();
        clock.advance(Duration::from_secs(11));
        supervisor.scan_once();
        supervisor.scan_once();

        assert_eq!(stats.snapshot().evictions, 1);
    }

    #[test]
    fn test_huge_timeout_is_clamped_and_scans_survive() {
        let store = Arc::new(SessionStore::new(3));
        let clock = Arc::new(ManualClock::new());
        let mut supervisor = TimeoutSupervisor::new(
            Arc::clone(&store),
            clock.clone(),
            SupervisorSettings {
                timeout: Duration::from_secs_f64(1e19),
                tick: Duration::from_millis(10),
                deadline_mode: DeadlineMode::Arrival,
            },
        );
        assert_eq!(supervisor.settings().timeout, MAX_TIMEOUT);

        let key = DeviceKey::new("W1", "D1");
        append(&store, &clock, &key);
        supervisor.start();
        thread::sleep(Duration::from_millis(100));

        assert!(supervisor.is_running());
        assert_eq!(
            store.snapshot(&key).and_then(|s| s.deadline),
            Some(clock.at_secs(0.0) + MAX_TIMEOUT)
        );
        supervisor.stop();

        // Far from expiring
        clock.advance(Duration::from_secs(3600));
        assert_eq!(supervisor.scan_once().evicted, 0);
    }

    #[test]
    fn test_start_stop() {
        let (mut supervisor, store, clock) = setup(DeadlineMode::Arrival);
        let key = DeviceKey::new("W1", "D1");
        append(&store, &clock, &key);

        supervisor.start();
        assert!(supervisor.is_running());
        thread::sleep(Duration::from_millis(100));
        supervisor.stop();
        assert!(!supervisor.is_running());

        // The background scans assigned the deadline
        assert!(store.snapshot(&key).and_then(|s| s.deadline).is_some());
    }
}
