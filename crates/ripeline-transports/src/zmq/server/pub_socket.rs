// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Feedback PUB socket
//!
//! Binds an address and broadcasts `(topic, data)` multipart frames. Devices
//! subscribe to their own `/{warehouse}/{device}` topic. Sends are bounded
//! by `send_timeout`, and queued frames get `linger` to flush on stop.

use crate::common::{ServerConfig, TransportError, TransportResult};
use crate::traits::{Publisher, Transport};
use crate::zmq::{check_size, option_millis, SocketSlot};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ZmqPub {
    context: Arc<zmq::Context>,
    config: ServerConfig,
    slot: SocketSlot,
}

impl ZmqPub {
    pub fn new(context: Arc<zmq::Context>, config: ServerConfig) -> TransportResult<Self> {
        config.base.validate()?;
        Ok(Self {
            context,
            config,
            slot: SocketSlot::empty(),
        })
    }

    /// Socket on its own context with default options
    pub fn with_address(address: impl Into<String>) -> TransportResult<Self> {
        Self::new(Arc::new(zmq::Context::new()), ServerConfig::new(address))
    }

    pub fn address(&self) -> &str {
        &self.config.base.address
    }

    fn open_socket(&self) -> TransportResult<zmq::Socket> {
        let base = &self.config.base;
        let socket = self.context.socket(zmq::PUB)?;
        socket.set_linger(option_millis(Some(self.config.linger)))?;
        socket.set_sndhwm(i32::try_from(base.send_hwm).unwrap_or(i32::MAX))?;
        socket.set_sndtimeo(option_millis(base.send_timeout))?;
        socket
            .bind(&base.address)
            .map_err(|e| TransportError::BindFailed(format!("{}: {}", base.address, e)))?;
        Ok(socket)
    }
}

impl Transport for ZmqPub {
    fn start(&mut self) -> TransportResult<()> {
        if self.slot.is_open() {
            return Err(TransportError::AlreadyRunning);
        }
        self.slot.install(self.open_socket()?)?;
        info!("[ZMQ-PUB] Publishing feedback on {}", self.address());
        Ok(())
    }

    fn stop(&mut self) -> TransportResult<()> {
        self.slot.close();
        debug!("[ZMQ-PUB] Closed {}", self.address());
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.slot.is_open()
    }

    fn transport_type(&self) -> &str {
        "zmq-pub"
    }
}

impl Publisher for ZmqPub {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()> {
        check_size(data.len(), self.config.base.max_message_size)?;

        self.slot.with(|socket| {
            socket
                .send_multipart([topic, data], 0)
                .map_err(|e| match e {
                    zmq::Error::EAGAIN => TransportError::Timeout,
                    other => TransportError::SendFailed(other.to_string()),
                })
        })
    }
}
