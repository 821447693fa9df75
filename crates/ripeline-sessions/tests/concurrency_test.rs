// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Concurrent ingestion against a live timeout supervisor

use crossbeam::channel::{self, Sender};
use ripeline_sessions::*;
use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

struct ChannelHandler {
    sender: Sender<CompletedBatch>,
}

impl BatchHandler for ChannelHandler {
    fn handle_batch(&self, batch: CompletedBatch) -> Result<(), BatchError> {
        self.sender
            .send(batch)
            .map_err(|e| BatchError::Failed(e.to_string()))
    }
}

/// Every reading ends up in exactly one dispatched batch or in the
/// still-open session; nothing is lost or duplicated.
#[test]
fn test_no_reading_lost_or_duplicated() {
    const LIMIT: usize = 4;
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let (sender, receiver) = channel::unbounded();
    let store = Arc::new(SessionStore::new(LIMIT));
    let stats = Arc::new(IngestStats::new());
    let dispatcher = Arc::new(
        IngestDispatcher::new(
            Arc::clone(&store),
            Arc::new(ChannelHandler { sender }),
            Arc::new(SystemClock),
        )
        .with_stats(Arc::clone(&stats)),
    );

    // Long timeout: the supervisor assigns deadlines but never evicts
    let mut supervisor = TimeoutSupervisor::with_stats(
        Arc::clone(&store),
        Arc::new(SystemClock),
        SupervisorSettings {
            timeout: Duration::from_secs(3600),
            tick: Duration::from_millis(1),
            deadline_mode: DeadlineMode::Arrival,
        },
        Arc::clone(&stats),
    );
    supervisor.start();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    // Two devices shared by all threads
                    let device = if i % 2 == 0 { "D1" } else { "D2" };
                    let value = (t * PER_THREAD + i) as f64;
                    let payload = format!("{},W1,{}", value, device);
                    dispatcher.handle_message(payload.as_bytes()).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    supervisor.stop();

    let batches: Vec<CompletedBatch> = receiver.try_iter().collect();
    let mut seen: HashMap<u64, usize> = HashMap::new();

    for batch in &batches {
        assert_eq!(batch.readings.len(), LIMIT);
        for reading in &batch.readings {
            *seen.entry(reading.values[0] as u64).or_default() += 1;
        }
    }
    for snapshot in store.snapshots() {
        assert!(snapshot.count < LIMIT);
        assert_eq!(snapshot.readings.len(), snapshot.count);
        for reading in &snapshot.readings {
            *seen.entry(reading.values[0] as u64).or_default() += 1;
        }
    }

    assert_eq!(seen.len(), THREADS * PER_THREAD);
    assert!(seen.values().all(|&n| n == 1));

    let stats = stats.snapshot();
    assert_eq!(stats.accepted, (THREADS * PER_THREAD) as u64);
    assert_eq!(stats.dispatched, batches.len() as u64);
    assert_eq!(stats.evictions, 0);
}

/// Readings sent from one thread to one device are batched in send order
#[test]
fn test_single_producer_order_preserved_under_supervision() {
    const LIMIT: usize = 5;

    let (sender, receiver) = channel::unbounded();
    let store = Arc::new(SessionStore::new(LIMIT));
    let dispatcher = IngestDispatcher::new(
        Arc::clone(&store),
        Arc::new(ChannelHandler { sender }),
        Arc::new(SystemClock),
    );
    let mut supervisor = TimeoutSupervisor::new(
        Arc::clone(&store),
        Arc::new(SystemClock),
        SupervisorSettings {
            timeout: Duration::from_secs(3600),
            tick: Duration::from_millis(1),
            deadline_mode: DeadlineMode::Scan,
        },
    );
    supervisor.start();

    for i in 0..100 {
        dispatcher.handle_message(format!("{},W9,D9", i).as_bytes()).unwrap();
    }
    supervisor.stop();

    let values: Vec<f64> = receiver
        .try_iter()
        .flat_map(|batch| batch.readings.into_iter().map(|r| r.values[0]))
        .collect();
    let expected: Vec<f64> = (0..100).map(|i| i as f64).collect();
    assert_eq!(values, expected);
}

/// Short timeouts: every reading is either dispatched or evicted, never both
#[test]
fn test_eviction_races_with_dispatch() {
    const LIMIT: usize = 3;

    let (sender, receiver) = channel::unbounded();
    let store = Arc::new(SessionStore::new(LIMIT));
    let stats = Arc::new(IngestStats::new());
    let dispatcher = Arc::new(
        IngestDispatcher::new(
            Arc::clone(&store),
            Arc::new(ChannelHandler { sender }),
            Arc::new(SystemClock),
        )
        .with_stats(Arc::clone(&stats)),
    );
    let mut supervisor = TimeoutSupervisor::with_stats(
        Arc::clone(&store),
        Arc::new(SystemClock),
        SupervisorSettings {
            timeout: Duration::from_millis(2),
            tick: Duration::from_millis(1),
            deadline_mode: DeadlineMode::Arrival,
        },
        Arc::clone(&stats),
    );
    supervisor.start();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                for i in 0..200 {
                    let payload = format!("{},W1,D{}", i, t);
                    dispatcher.handle_message(payload.as_bytes()).unwrap();
                    if i % 7 == 0 {
                        thread::sleep(Duration::from_millis(3));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    supervisor.stop();

    let batches: Vec<CompletedBatch> = receiver.try_iter().collect();
    assert!(batches.iter().all(|b| b.readings.len() == LIMIT));

    let stats = stats.snapshot();
    assert_eq!(stats.dispatched, batches.len() as u64);
    assert_eq!(stats.accepted, 800);

    // Sessions are always consistent after the dust settles
    for snapshot in store.snapshots() {
        assert_eq!(snapshot.readings.len(), snapshot.count);
        assert!(snapshot.count < LIMIT);
    }
}
