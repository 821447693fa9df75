// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Reading SUB socket
//!
//! Connects to the sensor broker and receives `(topic, payload)` frames.
//! Topic filters may be added before or after start; filters added while
//! stopped are applied when the socket opens.

use crate::common::{ClientConfig, TransportError, TransportResult};
use crate::traits::{Subscriber, Transport};
use crate::zmq::{check_size, SocketSlot};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ZmqSub {
    context: Arc<zmq::Context>,
    config: ClientConfig,
    slot: SocketSlot,
    /// Active topic filters, re-applied on every start
    filters: Mutex<Vec<Vec<u8>>>,
}

impl ZmqSub {
    pub fn new(context: Arc<zmq::Context>, config: ClientConfig) -> TransportResult<Self> {
        config.base.validate()?;
        let filters = config
            .subscriptions
            .iter()
            .map(|topic| topic.as_bytes().to_vec())
            .collect();

        Ok(Self {
            context,
            config,
            slot: SocketSlot::empty(),
            filters: Mutex::new(filters),
        })
    }

    /// Socket on its own context with default options
    pub fn with_address(address: impl Into<String>) -> TransportResult<Self> {
        Self::new(Arc::new(zmq::Context::new()), ClientConfig::new(address))
    }

    pub fn address(&self) -> &str {
        &self.config.base.address
    }

    fn read_frame(socket: &zmq::Socket) -> TransportResult<zmq::Message> {
        let mut frame = zmq::Message::new();
        socket
            .recv(&mut frame, 0)
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        Ok(frame)
    }
}

impl Transport for ZmqSub {
    fn start(&mut self) -> TransportResult<()> {
        if self.slot.is_open() {
            return Err(TransportError::AlreadyRunning);
        }

        let socket = self.context.socket(zmq::SUB)?;
        socket.set_linger(0)?;
        socket.set_rcvhwm(i32::try_from(self.config.base.recv_hwm).unwrap_or(i32::MAX))?;
        // No conflation: every reading counts towards a batch
        socket.set_conflate(false)?;
        socket
            .connect(&self.config.base.address)
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", self.config.base.address, e)))?;

        for filter in self.filters.lock().iter() {
            socket.set_subscribe(filter)?;
            debug!("[ZMQ-SUB] Filter {}", String::from_utf8_lossy(filter));
        }

        self.slot.install(socket)?;
        info!("[ZMQ-SUB] Connected to {}", self.address());
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        self.slot.close();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.slot.is_open()
    }

    fn transport_type(&self) -> &str {
        "zmq-sub"
    }
}

impl Subscriber for ZmqSub {
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let mut filters = self.filters.lock();
        if filters.iter().any(|f| f.as_slice() == topic) {
            return Ok(());
        }
        if self.slot.is_open() {
            self.slot.with(|socket| Ok(socket.set_subscribe(topic)?))?;
        }
        filters.push(topic.to_vec());
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()> {
        let mut filters = self.filters.lock();
        let Some(position) = filters.iter().position(|f| f.as_slice() == topic) else {
            return Ok(());
        };
        if self.slot.is_open() {
            self.slot.with(|socket| Ok(socket.set_unsubscribe(topic)?))?;
        }
        filters.remove(position);
        Ok(())
    }

    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)> {
        let max_size = self.config.base.max_message_size;

        self.slot.with(|socket| {
            let mut items = [socket.as_poll_item(zmq::POLLIN)];
            let timeout = i64::try_from(timeout_ms).unwrap_or(i64::MAX);
            if zmq::poll(&mut items, timeout)? == 0 || !items[0].is_readable() {
                return Err(TransportError::Timeout);
            }

            let first = Self::read_frame(socket)?;
            if !socket.get_rcvmore()? {
                // Single-frame publisher: no topic frame
                check_size(first.len(), max_size)?;
                return Ok((Vec::new(), first.to_vec()));
            }

            let payload = Self::read_frame(socket)?;
            // Keep the next receive aligned on a message boundary
            while socket.get_rcvmore()? {
                Self::read_frame(socket)?;
            }

            check_size(payload.len(), max_size)?;
            Ok((first.to_vec(), payload.to_vec()))
        })
    }
}
