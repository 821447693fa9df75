// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! In-process publish/subscribe bus
//!
//! Mirrors the ZMQ PUB/SUB semantics (prefix topic filtering, multipart
//! `(topic, data)` delivery, fire-and-forget publishing) over crossbeam
//! channels, for single-host deployments and tests that must not open
//! network sockets.

use crate::common::{TransportError, TransportResult};
use crate::traits::{Publisher, Subscriber, Transport};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type Frame = (Vec<u8>, Vec<u8>);

struct SubscriberSlot {
    topics: Arc<Mutex<Vec<Vec<u8>>>>,
    sender: Sender<Frame>,
}

/// Shared bus connecting memory publishers and subscribers
#[derive(Clone, Default)]
pub struct MemoryBus {
    slots: Arc<Mutex<Vec<SubscriberSlot>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a publisher attached to this bus
    pub fn publisher(&self) -> MemoryPublisher {
        MemoryPublisher {
            bus: self.clone(),
            running: false,
        }
    }

    /// Create a subscriber attached to this bus
    ///
    /// The subscriber receives nothing until it is started and subscribed.
    pub fn subscriber(&self) -> MemorySubscriber {
        MemorySubscriber {
            bus: self.clone(),
            topics: Arc::new(Mutex::new(Vec::new())),
            receiver: None,
        }
    }

    /// Number of attached, started subscribers
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().len()
    }

    fn deliver(&self, topic: &[u8], data: &[u8]) {
        let mut slots = self.slots.lock();
        // Drop slots whose subscriber went away
        slots.retain(|slot| {
            let matches = slot.topics.lock().iter().any(|t| topic.starts_with(t));
            if !matches {
                return true;
            }
            slot.sender.send((topic.to_vec(), data.to_vec())).is_ok()
        });
    }
}

/// In-process publisher (PUB side)
pub struct MemoryPublisher {
    bus: MemoryBus,
    running: bool,
}

impl Transport for MemoryPublisher {
    fn start(&mut self) -> TransportResult<()> {
        if self.running {
            return Err(TransportError::AlreadyRunning);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn transport_type(&self) -> &str {
        "memory-pub"
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
        if !self.running {
            return Err(TransportError::NotRunning);
        }
        self.bus.deliver(topic, data);
        Ok(())
    }
}

/// In-process subscriber (SUB side)
pub struct MemorySubscriber {
    bus: MemoryBus,
    topics: Arc<Mutex<Vec<Vec<u8>>>>,
    receiver: Option<Receiver<Frame>>,
}

impl Transport for MemorySubscriber {
    fn start(&mut self) -> TransportResult<()> {
        if self.receiver.is_some() {
            return Err(TransportError::AlreadyRunning);
        }
        let (sender, receiver) = channel::unbounded();
        self.bus.slots.lock().push(SubscriberSlot {
            topics: Arc::clone(&self.topics),
            sender,
        });
        self.receiver = Some(receiver);
        debug!("[MEMORY-SUB] Attached to in-process bus");
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        // Dropping the receiver detaches the slot on the next publish
        self.receiver = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.receiver.is_some()
    }

    fn transport_type(&self) -> &str {
        "memory-sub"
    }
}

impl Subscriber for MemorySubscriber {
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        if self.receiver.is_none() {
            return Err(TransportError::NotRunning);
        }
        self.topics.lock().push(topic.to_vec());
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        if self.receiver.is_none() {
            return Err(TransportError::NotRunning);
        }
        let mut topics = self.topics.lock();
        if let Some(pos) = topics.iter().position(|t| t.as_slice() == topic) {
            topics.remove(pos);
        }
        Ok(())
    }

    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)> {
        let receiver = self.receiver.as_ref().ok_or(TransportError::NotRunning)?;
        receiver
            .recv_timeout(Duration::from_millis(timeout_ms))
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => TransportError::Timeout,
                RecvTimeoutError::Disconnected => TransportError::ConnectionClosed,
            })
    }
}
