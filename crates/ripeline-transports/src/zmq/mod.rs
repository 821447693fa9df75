// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! ZMQ transport implementations
//!
//! - **PUB** (server): binds and publishes per-device feedback
//! - **SUB** (client): connects to the sensor broker and receives readings
//!
//! ## Feature Flags
//!
//! - `zmq-server`: Enable the PUB socket
//! - `zmq-client`: Enable the SUB socket
//! - `zmq`: Enable both

use crate::common::{TransportError, TransportResult};
use parking_lot::Mutex;
use std::time::Duration;

#[cfg(feature = "zmq-server")]
pub mod server;

#[cfg(feature = "zmq-client")]
pub mod client;

#[cfg(feature = "zmq-server")]
pub use server::ZmqPub;

#[cfg(feature = "zmq-client")]
pub use client::ZmqSub;

/// Socket holder shared by the PUB and SUB wrappers
///
/// A socket is present exactly while the transport runs.
pub(crate) struct SocketSlot {
    socket: Mutex<Option<zmq::Socket>>,
}

impl SocketSlot {
    pub(crate) fn empty() -> Self {
        Self {
            socket: Mutex::new(None),
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.socket.lock().is_some()
    }

    pub(crate) fn install(&self, socket: zmq::Socket) -> TransportResult<()> {
        let mut slot = self.socket.lock();
        if slot.is_some() {
            return Err(TransportError::AlreadyRunning);
        }
        *slot = Some(socket);
        Ok(())
    }

    /// Drop the socket; linger applies from here
    pub(crate) fn close(&self) {
        self.socket.lock().take();
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&zmq::Socket) -> TransportResult<R>) -> TransportResult<R> {
        let slot = self.socket.lock();
        let socket = slot.as_ref().ok_or(TransportError::NotRunning)?;
        f(socket)
    }
}

/// Milliseconds for a ZMQ socket option, `-1` meaning "forever"
pub(crate) fn option_millis(duration: Option<Duration>) -> i32 {
    match duration {
        Some(d) => i32::try_from(d.as_millis()).unwrap_or(i32::MAX),
        None => -1,
    }
}

pub(crate) fn check_size(len: usize, max_size: Option<usize>) -> TransportResult<()> {
    match max_size {
        Some(max_size) if len > max_size => Err(TransportError::MessageTooLarge { size: len, max_size }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_millis() {
        assert_eq!(option_millis(None), -1);
        assert_eq!(option_millis(Some(Duration::from_millis(250))), 250);
        assert_eq!(option_millis(Some(Duration::from_secs(u64::MAX / 4))), i32::MAX);
    }

    #[test]
    fn test_check_size() {
        assert!(check_size(10, None).is_ok());
        assert!(check_size(10, Some(10)).is_ok());
        assert!(matches!(
            check_size(11, Some(10)),
            Err(TransportError::MessageTooLarge { size: 11, max_size: 10 })
        ));
    }
}
