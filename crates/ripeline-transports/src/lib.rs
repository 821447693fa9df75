// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Publish/subscribe plumbing for ripeline
//!
//! Devices talk to the service over a pair of ZMQ sockets: readings and status
//! requests arrive on a SUB socket, feedback leaves on a PUB socket keyed by
//! `/{warehouse}/{device}`. [`MemoryBus`] offers the same [`Publisher`] and
//! [`Subscriber`] seams in-process and needs no feature flag.
//!
//! Features: `zmq-server` (PUB), `zmq-client` (SUB), `zmq` (both).
//!
//! ```no_run
//! # #[cfg(feature = "zmq")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ripeline_transports::zmq::{ZmqPub, ZmqSub};
//! use ripeline_transports::{Publisher, Subscriber, Transport};
//!
//! let mut feedback = ZmqPub::with_address("tcp://*:1884")?;
//! feedback.start()?;
//!
//! let mut readings = ZmqSub::with_address("tcp://localhost:1883")?;
//! readings.start()?;
//! readings.subscribe(b"/proto/out")?;
//!
//! let (_topic, payload) = readings.receive_timeout(500)?;
//! feedback.publish(b"/W1/D1", &payload)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "zmq"))]
//! # fn main() {}
//! ```

pub mod common;
pub mod memory;
pub mod traits;

#[cfg(any(feature = "zmq-server", feature = "zmq-client"))]
pub mod zmq;

pub use common::{ClientConfig, ServerConfig, SocketConfig, TransportError, TransportResult};

pub use memory::{MemoryBus, MemoryPublisher, MemorySubscriber};

pub use traits::{Publisher, Subscriber, Transport};

pub mod prelude {
    pub use crate::common::*;
    pub use crate::memory::*;
    pub use crate::traits::*;

    #[cfg(feature = "zmq-server")]
    pub use crate::zmq::server::*;

    #[cfg(feature = "zmq-client")]
    pub use crate::zmq::client::*;
}
