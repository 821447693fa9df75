// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Transport seams
//!
//! The ingestion service is written against these traits only, so it runs
//! unchanged over ZMQ sockets or the in-process bus.

use crate::common::TransportResult;

/// Lifecycle shared by every socket-like transport
pub trait Transport: Send + Sync {
    fn start(&mut self) -> TransportResult<()>;

    fn stop(&mut self) -> TransportResult<()>;

    fn is_running(&self) -> bool;

    /// Short name for logs, e.g. `zmq-pub`
    fn transport_type(&self) -> &str;
}

/// Fire-and-forget broadcast of `(topic, data)` frames
pub trait Publisher: Transport {
    fn publish(&self, topic: &[u8], data: &[u8]) -> TransportResult<()>;
}

/// Receiving side of a broadcast; topics are prefix filters
pub trait Subscriber: Transport {
    fn subscribe(&mut self, topic: &[u8]) -> TransportResult<()>;

    fn unsubscribe(&mut self, topic: &[u8]) -> TransportResult<()>;

    /// Next `(topic, data)` pair, or [`TransportError::Timeout`] after
    /// `timeout_ms` without one
    ///
    /// [`TransportError::Timeout`]: crate::TransportError::Timeout
    fn receive_timeout(&self, timeout_ms: u64) -> TransportResult<(Vec<u8>, Vec<u8>)>;
}
