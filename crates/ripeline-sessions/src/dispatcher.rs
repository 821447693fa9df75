// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Ingestion dispatcher
//!
//! Parses inbound payloads, appends readings to their device session and,
//! when a session reaches its batch size, hands the completed batch to a
//! [`BatchHandler`].
//!
//! The batch is taken and the session reset in the same critical section,
//! so a completed batch is dispatched exactly once and the device is ready
//! for a fresh batch before the handler even starts. The handler then runs
//! outside the lock; its errors and panics are logged and counted but never
//! reach the caller.

use crate::clock::Clock;
use crate::error::{BatchError, Result};
use crate::parser::parse_payload;
use crate::stats::IngestStats;
use crate::store::SessionStore;
use crate::types::{DeviceKey, Reading};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A full batch, owned exclusively by the handler it is given to
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedBatch {
    pub key: DeviceKey,
    pub feedback_topic: String,
    /// Readings in arrival order
    pub readings: Vec<Reading>,
    pub first_reading_at: Instant,
    pub completed_at: Instant,
}

/// Downstream consumer of completed batches
pub trait BatchHandler: Send + Sync {
    fn handle_batch(&self, batch: CompletedBatch) -> std::result::Result<(), BatchError>;
}

impl<F> BatchHandler for F
where
    F: Fn(CompletedBatch) -> std::result::Result<(), BatchError> + Send + Sync,
{
    fn handle_batch(&self, batch: CompletedBatch) -> std::result::Result<(), BatchError> {
        self(batch)
    }
}

/// How the batch handler finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Completed,
    Failed,
    Panicked,
}

/// Result of handling one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Reading stored; batch not yet complete
    Accumulated { count: usize, limit: usize },
    /// Reading completed a batch, which was dispatched; session is reset
    Dispatched {
        batch_size: usize,
        handler: HandlerOutcome,
    },
}

enum AppendStep {
    Pending { count: usize, limit: usize },
    Complete(CompletedBatch),
}

/// Turns inbound messages into session updates and batch dispatches
pub struct IngestDispatcher {
    store: Arc<SessionStore>,
    handler: Arc<dyn BatchHandler>,
    clock: Arc<dyn Clock>,
    stats: Arc<IngestStats>,
}

impl IngestDispatcher {
    pub fn new(store: Arc<SessionStore>, handler: Arc<dyn BatchHandler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            handler,
            clock,
            stats: Arc::new(IngestStats::new()),
        }
    }

    /// Share counters with other components (e.g. the timeout supervisor)
    pub fn with_stats(mut self, stats: Arc<IngestStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handle one raw payload
    ///
    /// # Errors
    ///
    /// Only [`IngestError::MalformedMessage`](crate::IngestError::MalformedMessage);
    /// the message is dropped and no session is touched.
    pub fn handle_message(&self, payload: &[u8]) -> Result<MessageOutcome> {
        let parsed = match parse_payload(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.stats.record_malformed();
                warn!("Dropping message: {}", e);
                return Err(e);
            }
        };

        Ok(self.handle_reading(parsed.key, parsed.reading))
    }

    /// Append an already-parsed reading for `key`
    pub fn handle_reading(&self, key: DeviceKey, reading: Reading) -> MessageOutcome {
        let now = self.clock.now();

        let step = self.store.with_session(&key, |session| {
            let count = session.append(reading, now);
            if !session.is_complete() {
                return AppendStep::Pending {
                    count,
                    limit: session.limit(),
                };
            }

            let first_reading_at = session.first_reading_at().unwrap_or(now);
            let feedback_topic = session.feedback_topic().to_string();
            let readings = session.take_batch();
            AppendStep::Complete(CompletedBatch {
                key: session.key().clone(),
                feedback_topic,
                readings,
                first_reading_at,
                completed_at: now,
            })
        });

        self.stats.record_accepted();

        match step {
            AppendStep::Pending { count, limit } => {
                debug!("Device {} has {}/{} readings", key, count, limit);
                MessageOutcome::Accumulated { count, limit }
            }
            AppendStep::Complete(batch) => {
                debug!("Session reset for device {} after batch completion", key);
                self.dispatch(batch)
            }
        }
    }

    fn dispatch(&self, batch: CompletedBatch) -> MessageOutcome {
        let key = batch.key.clone();
        let batch_size = batch.readings.len();

        info!("Dispatching batch of {} readings for device {}", batch_size, key);
        self.stats.record_dispatched();

        let result = catch_unwind(AssertUnwindSafe(|| self.handler.handle_batch(batch)))
            .unwrap_or_else(|payload| Err(BatchError::Panicked(panic_message(payload.as_ref()))));

        let handler = match result {
            Ok(()) => HandlerOutcome::Completed,
            Err(e) => {
                self.stats.record_handler_failure();
                error!("Batch for device {} was not fully processed: {}", key, e);
                match e {
                    BatchError::Failed(_) => HandlerOutcome::Failed,
                    BatchError::Panicked(_) => HandlerOutcome::Panicked,
                }
            }
        };

        MessageOutcome::Dispatched { batch_size, handler }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::IngestError;
    use parking_lot::Mutex;

    struct Recorder {
        batches: Mutex<Vec<CompletedBatch>>,
    }

    impl BatchHandler for Recorder {
        fn handle_batch(&self, batch: CompletedBatch) -> std::result::Result<(), BatchError> {
            self.batches.lock().push(batch);
            Ok(())
        }
    }

    fn setup(limit: usize) -> (IngestDispatcher, Arc<Recorder>, Arc<ManualClock>) {
        let recorder = Arc::new(Recorder {
            batches: Mutex::new(Vec::new()),
        });
        let clock = Arc::new(ManualClock::new());
        let dispatcher = IngestDispatcher::new(
            Arc::new(SessionStore::new(limit)),
            recorder.clone(),
            clock.clone(),
        );
        (dispatcher, recorder, clock)
    }

    #[test]
    fn test_accumulate_then_dispatch() {
        let (dispatcher, recorder, _clock) = setup(2);

        let first = dispatcher.handle_message(b"1,2,W1,D1").unwrap();
        assert_eq!(first, MessageOutcome::Accumulated { count: 1, limit: 2 });
        assert!(recorder.batches.lock().is_empty());

        let second = dispatcher.handle_message(b"3,4,W1,D1").unwrap();
        assert_eq!(
            second,
            MessageOutcome::Dispatched {
                batch_size: 2,
                handler: HandlerOutcome::Completed
            }
        );

        let batches = recorder.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].feedback_topic, "/W1/D1");
        assert_eq!(batches[0].readings[0].values, vec![1.0, 2.0]);
        assert_eq!(batches[0].readings[1].values, vec![3.0, 4.0]);
    }

    #[test]
    fn test_malformed_message_touches_nothing() {
        let (dispatcher, _recorder, _clock) = setup(2);

        let err = dispatcher.handle_message(b"x,W1,D1").unwrap_err();
        assert!(matches!(err, IngestError::MalformedMessage(_)));
        assert_eq!(dispatcher.store().device_count(), 0);
        assert_eq!(dispatcher.stats().snapshot().malformed, 1);
        assert_eq!(dispatcher.stats().snapshot().accepted, 0);
    }

    #[test]
    fn test_batch_timestamps() {
        let (dispatcher, recorder, clock) = setup(2);
        let t0 = clock.now();

        dispatcher.handle_message(b"1,W1,D1").unwrap();
        clock.advance(std::time::Duration::from_secs(3));
        dispatcher.handle_message(b"2,W1,D1").unwrap();

        let batches = recorder.batches.lock();
        assert_eq!(batches[0].first_reading_at, t0);
        assert_eq!(batches[0].completed_at, clock.at_secs(3.0));
    }

    #[test]
    fn test_closure_handler() {
        let store = Arc::new(SessionStore::new(1));
        let handler = |_batch: CompletedBatch| -> std::result::Result<(), BatchError> {
            Err(BatchError::Failed("model offline".to_string()))
        };
        let dispatcher = IngestDispatcher::new(store, Arc::new(handler), Arc::new(ManualClock::new()));

        let outcome = dispatcher.handle_message(b"1,W1,D1").unwrap();
        assert_eq!(
            outcome,
            MessageOutcome::Dispatched {
                batch_size: 1,
                handler: HandlerOutcome::Failed
            }
        );
        assert_eq!(dispatcher.stats().snapshot().handler_failures, 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
