//! # Ripeline - streaming ingestion for ripeness sensors
//!
//! Sensor devices stream comma-separated readings tagged with a warehouse and
//! device id. Ripeline groups readings per device into fixed-size batches,
//! evicts batches that do not complete in time, and hands every completed
//! batch to an inference gateway that scores it, publishes feedback to the
//! device and persists the result.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! ripeline = "0.1"  # Default: ZMQ transport enabled
//! ```
//!
//! ## Feature Flags
//!
//! - **`zmq-transport`** (default): ZMQ PUB/SUB sockets in
//!   [`transports::zmq`]. Without it only the in-process bus is available.
//!
//! ## Usage
//!
//! ```rust
//! use ripeline::prelude::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SessionStore::new(2));
//! let handler = |batch: CompletedBatch| -> Result<(), BatchError> {
//!     println!("{} readings from {}", batch.readings.len(), batch.key);
//!     Ok(())
//! };
//! let dispatcher = IngestDispatcher::new(Arc::clone(&store), Arc::new(handler), Arc::new(SystemClock));
//! let mut supervisor = TimeoutSupervisor::new(store, Arc::new(SystemClock), SupervisorSettings::default());
//! supervisor.start();
//!
//! dispatcher.handle_message(b"0.41,0.39,W1,D1")?;
//! dispatcher.handle_message(b"0.43,0.40,W1,D1")?;
//!
//! supervisor.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: ripeline-config, ripeline-observability    │
//! │  (TOML + overrides, tracing setup)                      │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: ripeline-transports                               │
//! │  (ZMQ PUB/SUB, in-process bus)                          │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Core: ripeline-sessions                                │
//! │  (session store, dispatcher, timeout supervisor)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Downstream: ripeline-inference                         │
//! │  (calibration, predictors, feedback, result journal)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ripeline-ingest` binary wires all of the above to a pair of ZMQ
//! sockets.
//!
//! ## License
//!
//! Apache-2.0

pub use ripeline_config as config;
pub use ripeline_inference as inference;
pub use ripeline_observability as observability;
pub use ripeline_sessions as sessions;
pub use ripeline_transports as transports;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::sessions::{
        BatchError, BatchHandler, Clock, CompletedBatch, DeadlineMode, DeviceKey, IngestDispatcher,
        MessageOutcome, Reading, SessionStore, SupervisorSettings, SystemClock, TimeoutSupervisor,
    };

    pub use crate::inference::{
        BrixBand, DeviceConfigLookup, DeviceProfile, FeedbackPublisher, GatewaySettings,
        InferenceGateway, ModelRegistry, Prediction, ResultSink, StatusService, StatusStore,
    };

    pub use crate::transports::{Publisher, Subscriber, Transport};
}
