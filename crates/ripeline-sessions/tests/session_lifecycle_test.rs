// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Session lifecycle tests: accumulation, dispatch, reset and eviction

use parking_lot::Mutex;
use ripeline_sessions::*;
use std::sync::Arc;
use std::time::Duration;

/// Records every batch it receives, then behaves as configured
struct ScriptedHandler {
    batches: Mutex<Vec<CompletedBatch>>,
    behaviour: Behaviour,
}

#[derive(Clone, Copy)]
enum Behaviour {
    Succeed,
    Fail,
    Panic,
}

impl ScriptedHandler {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(Vec::new()),
            behaviour,
        })
    }

    fn dispatch_count(&self) -> usize {
        self.batches.lock().len()
    }
}

impl BatchHandler for ScriptedHandler {
    fn handle_batch(&self, batch: CompletedBatch) -> Result<(), BatchError> {
        self.batches.lock().push(batch);
        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => Err(BatchError::Failed("predictor and sink unavailable".to_string())),
            Behaviour::Panic => panic!("handler blew up"),
        }
    }
}

struct Harness {
    dispatcher: IngestDispatcher,
    supervisor: TimeoutSupervisor,
    store: Arc<SessionStore>,
    clock: Arc<ManualClock>,
    handler: Arc<ScriptedHandler>,
    stats: Arc<IngestStats>,
}

fn harness(limit: usize, behaviour: Behaviour) -> Harness {
    let store = Arc::new(SessionStore::new(limit));
    let clock = Arc::new(ManualClock::new());
    let handler = ScriptedHandler::new(behaviour);
    let stats = Arc::new(IngestStats::new());

    let dispatcher = IngestDispatcher::new(Arc::clone(&store), handler.clone(), clock.clone())
        .with_stats(Arc::clone(&stats));
    let supervisor = TimeoutSupervisor::with_stats(
        Arc::clone(&store),
        clock.clone(),
        SupervisorSettings {
            timeout: Duration::from_secs(10),
            tick: Duration::from_millis(100),
            deadline_mode: DeadlineMode::Arrival,
        },
        Arc::clone(&stats),
    );

    Harness {
        dispatcher,
        supervisor,
        store,
        clock,
        handler,
        stats,
    }
}

fn w1d1() -> DeviceKey {
    DeviceKey::new("W1", "D1")
}

#[test]
fn test_fewer_than_limit_messages_never_dispatch() {
    for limit in 1..=6 {
        let h = harness(limit, Behaviour::Succeed);
        for i in 0..limit - 1 {
            let outcome = h.dispatcher.handle_message(format!("{},W1,D1", i).as_bytes()).unwrap();
            assert_eq!(
                outcome,
                MessageOutcome::Accumulated {
                    count: i + 1,
                    limit
                }
            );
        }

        let count = h.store.snapshot(&w1d1()).map(|s| s.count).unwrap_or(0);
        assert_eq!(count, limit - 1);
        assert_eq!(h.handler.dispatch_count(), 0);
    }
}

#[test]
fn test_limit_th_message_dispatches_once_regardless_of_outcome() {
    for behaviour in [Behaviour::Succeed, Behaviour::Fail, Behaviour::Panic] {
        let h = harness(3, behaviour);
        h.dispatcher.handle_message(b"1,W1,D1").unwrap();
        h.dispatcher.handle_message(b"2,W1,D1").unwrap();
        let outcome = h.dispatcher.handle_message(b"3,W1,D1").unwrap();

        assert!(matches!(outcome, MessageOutcome::Dispatched { batch_size: 3, .. }));
        assert_eq!(h.handler.dispatch_count(), 1);
        assert_eq!(h.stats.snapshot().dispatched, 1);

        let snapshot = h.store.snapshot(&w1d1()).unwrap();
        assert_eq!(snapshot.count, 0);
        assert!(snapshot.readings.is_empty());
        assert_eq!(snapshot.deadline, None);
        assert_eq!(snapshot.state, SessionState::Idle);

        // The device accepts a fresh batch afterwards
        let next = h.dispatcher.handle_message(b"4,W1,D1").unwrap();
        assert_eq!(next, MessageOutcome::Accumulated { count: 1, limit: 3 });
    }
}

#[test]
fn test_handler_outcomes_are_reported() {
    let failing = harness(1, Behaviour::Fail);
    assert_eq!(
        failing.dispatcher.handle_message(b"1,W1,D1").unwrap(),
        MessageOutcome::Dispatched {
            batch_size: 1,
            handler: HandlerOutcome::Failed
        }
    );

    let panicking = harness(1, Behaviour::Panic);
    assert_eq!(
        panicking.dispatcher.handle_message(b"1,W1,D1").unwrap(),
        MessageOutcome::Dispatched {
            batch_size: 1,
            handler: HandlerOutcome::Panicked
        }
    );
    assert_eq!(panicking.stats.snapshot().handler_failures, 1);
}

#[test]
fn test_stale_session_is_evicted_without_dispatch() {
    let h = harness(3, Behaviour::Succeed);
    h.dispatcher.handle_message(b"1,W1,D1").unwrap();
    h.dispatcher.handle_message(b"2,W1,D1").unwrap();
    h.supervisor.scan_once();

    h.clock.advance(Duration::from_secs(15));
    let report = h.supervisor.scan_once();

    assert_eq!(report.evicted, 1);
    assert_eq!(h.handler.dispatch_count(), 0);
    assert!(h.store.snapshot(&w1d1()).unwrap().is_empty());
    assert_eq!(h.stats.snapshot().evictions, 1);
}

#[test]
fn test_late_deadline_check_after_dispatch_is_noop() {
    let h = harness(2, Behaviour::Succeed);
    h.dispatcher.handle_message(b"1,W1,D1").unwrap();
    h.supervisor.scan_once();
    h.clock.advance(Duration::from_secs(3));
    h.dispatcher.handle_message(b"2,W1,D1").unwrap();

    h.clock.advance(Duration::from_secs(20));
    let report = h.supervisor.scan_once();

    assert_eq!(report.evicted, 0);
    assert_eq!(report.deadlines_assigned, 0);
    assert_eq!(h.handler.dispatch_count(), 1);
    assert_eq!(h.stats.snapshot().evictions, 0);
}

#[test]
fn test_batches_preserve_arrival_order() {
    let h = harness(4, Behaviour::Succeed);
    for value in ["4", "1", "3", "2"] {
        h.dispatcher.handle_message(format!("{},W1,D1", value).as_bytes()).unwrap();
    }

    let batches = h.handler.batches.lock();
    let values: Vec<f64> = batches[0].readings.iter().map(|r| r.values[0]).collect();
    assert_eq!(values, vec![4.0, 1.0, 3.0, 2.0]);
}

/// limit=2, timeout=10s: message at t=0, second at t=3 dispatches; no eviction
#[test]
fn test_scenario_dispatch_preempts_deadline() {
    let h = harness(2, Behaviour::Succeed);

    h.dispatcher.handle_message(b"1.0,2.0,W1,D1").unwrap();
    h.supervisor.scan_once();
    let snapshot = h.store.snapshot(&w1d1()).unwrap();
    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.deadline, Some(h.clock.at_secs(10.0)));

    h.clock.set_elapsed(Duration::from_secs(3));
    let outcome = h.dispatcher.handle_message(b"3.0,4.0,W1,D1").unwrap();
    assert!(matches!(outcome, MessageOutcome::Dispatched { batch_size: 2, .. }));

    {
        let batches = h.handler.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].readings[0].values, vec![1.0, 2.0]);
        assert_eq!(batches[0].readings[1].values, vec![3.0, 4.0]);
    }
    assert_eq!(h.store.snapshot(&w1d1()).unwrap().count, 0);

    h.clock.set_elapsed(Duration::from_secs(11));
    assert_eq!(h.supervisor.scan_once().evicted, 0);
    assert_eq!(h.stats.snapshot().evictions, 0);
}

/// limit=2, timeout=10s: message at t=0 only; at t=11 the session is reset
#[test]
fn test_scenario_lonely_reading_evicted() {
    let h = harness(2, Behaviour::Succeed);

    h.dispatcher.handle_message(b"1.0,2.0,W1,D1").unwrap();
    h.supervisor.scan_once();

    h.clock.set_elapsed(Duration::from_secs(11));
    h.supervisor.scan_once();

    let snapshot = h.store.snapshot(&w1d1()).unwrap();
    assert_eq!(snapshot.count, 0);
    assert!(snapshot.readings.is_empty());
    assert_eq!(h.handler.dispatch_count(), 0);
}

/// A supervisor that first notices the session late still honours the arrival time
#[test]
fn test_first_scan_after_deadline_evicts_immediately() {
    let h = harness(2, Behaviour::Succeed);
    h.dispatcher.handle_message(b"1,W1,D1").unwrap();

    h.clock.set_elapsed(Duration::from_secs(12));
    let report = h.supervisor.scan_once();

    assert_eq!(report.deadlines_assigned, 1);
    assert_eq!(report.evicted, 1);
}

#[test]
fn test_devices_are_independent() {
    let h = harness(2, Behaviour::Succeed);
    h.dispatcher.handle_message(b"1,W1,D1").unwrap();
    h.dispatcher.handle_message(b"1,W1,D2").unwrap();
    h.dispatcher.handle_message(b"1,W2,D1").unwrap();
    h.dispatcher.handle_message(b"2,W1,D2").unwrap();

    assert_eq!(h.store.device_count(), 3);
    let batches = h.handler.batches.lock();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].key, DeviceKey::new("W1", "D2"));
    assert_eq!(batches[0].feedback_topic, "/W1/D2");
}

#[test]
fn test_malformed_messages_do_not_disturb_sessions() {
    let h = harness(2, Behaviour::Succeed);
    h.dispatcher.handle_message(b"1,W1,D1").unwrap();

    assert!(h.dispatcher.handle_message(b"oops,W1,D1").is_err());
    assert!(h.dispatcher.handle_message(b"W1,D1").is_err());

    assert_eq!(h.store.snapshot(&w1d1()).unwrap().count, 1);
    let stats = h.stats.snapshot();
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.malformed, 2);
}
