// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Topic routing and the receive loop

use ripeline_inference::StatusService;
use ripeline_sessions::{IngestDispatcher, MessageOutcome};
use ripeline_transports::{Subscriber, TransportError, TransportResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What happened to one received message
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Reading(MessageOutcome),
    /// Status request handled; carries the published status
    Status(i64),
    /// Malformed payload or failed status request
    Rejected,
    /// Topic is neither the reading nor the status topic
    Ignored,
}

/// Sends reading messages to the dispatcher and status requests to the
/// status service
pub struct IngestRouter {
    dispatcher: Arc<IngestDispatcher>,
    status: StatusService,
    reading_topic: Vec<u8>,
    status_topic: Vec<u8>,
}

impl IngestRouter {
    pub fn new(
        dispatcher: Arc<IngestDispatcher>,
        status: StatusService,
        reading_topic: impl Into<String>,
        status_topic: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            status,
            reading_topic: reading_topic.into().into_bytes(),
            status_topic: status_topic.into().into_bytes(),
        }
    }

    pub fn dispatcher(&self) -> &Arc<IngestDispatcher> {
        &self.dispatcher
    }

    /// Topics the subscriber must be subscribed to
    pub fn topics(&self) -> [&[u8]; 2] {
        [self.reading_topic.as_slice(), self.status_topic.as_slice()]
    }

    pub fn route(&self, topic: &[u8], payload: &[u8]) -> Route {
        if topic == self.reading_topic.as_slice() {
            // Malformed readings are logged and counted by the dispatcher
            return match self.dispatcher.handle_message(payload) {
                Ok(outcome) => Route::Reading(outcome),
                Err(_) => Route::Rejected,
            };
        }

        if topic == self.status_topic.as_slice() {
            return match self.status.handle_status_message(payload) {
                Ok(status) => Route::Status(status),
                Err(e) => {
                    error!("Status request failed: {}", e);
                    Route::Rejected
                }
            };
        }

        debug!("Ignoring message on topic {}", String::from_utf8_lossy(topic));
        Route::Ignored
    }
}

/// Poll `subscriber` until `running` is cleared, routing every message
///
/// Returns the number of messages received. Receive errors other than a
/// poll timeout are logged and the loop carries on, except for a closed or
/// stopped transport which ends it.
pub fn run_receive_loop<S: Subscriber + ?Sized>(
    subscriber: &S,
    router: &IngestRouter,
    running: &AtomicBool,
    poll_ms: u64,
) -> TransportResult<u64> {
    let mut received = 0u64;

    while running.load(Ordering::Relaxed) {
        match subscriber.receive_timeout(poll_ms) {
            Ok((topic, payload)) => {
                received += 1;
                router.route(&topic, &payload);
            }
            Err(TransportError::Timeout) => continue,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!("Receive failed: {}", e),
        }
    }

    Ok(received)
}
