// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! # ripeline-sessions
//!
//! Per-device session windowing and timeout eviction.
//!
//! Readings arrive as `r1,...,rN,warehouse_id,device_id` payloads. Each
//! device accumulates readings in its own session until the batch size is
//! reached, at which point the batch is handed to a [`BatchHandler`] and the
//! session is reset. A [`TimeoutSupervisor`] evicts sessions whose batch does
//! not complete in time.
//!
//! ## Components
//!
//! - [`SessionStore`]: the only owner of session state, with per-device locking
//! - [`IngestDispatcher`]: parse, append, detect completion, dispatch, reset
//! - [`TimeoutSupervisor`]: fixed-tick deadline assignment and eviction
//!
//! ## Example
//!
//! ```
//! use ripeline_sessions::*;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SessionStore::new(2));
//! let handler = |batch: CompletedBatch| -> Result<(), BatchError> {
//!     assert_eq!(batch.readings.len(), 2);
//!     Ok(())
//! };
//! let dispatcher = IngestDispatcher::new(store, Arc::new(handler), Arc::new(SystemClock));
//!
//! dispatcher.handle_message(b"1.0,2.0,W1,D1").unwrap();
//! let outcome = dispatcher.handle_message(b"1.5,2.5,W1,D1").unwrap();
//! assert!(matches!(outcome, MessageOutcome::Dispatched { batch_size: 2, .. }));
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod parser;
pub mod session;
pub mod stats;
pub mod store;
pub mod supervisor;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{BatchHandler, CompletedBatch, HandlerOutcome, IngestDispatcher, MessageOutcome};
pub use error::{BatchError, IngestError};
pub use parser::{parse_payload, ParsedMessage};
pub use session::{DeviceSession, SessionSnapshot, SessionState};
pub use stats::{IngestStats, StatsSnapshot};
pub use store::SessionStore;
pub use supervisor::{DeadlineMode, ScanReport, SupervisorSettings, TimeoutSupervisor, MAX_TIMEOUT};
pub use types::{DeviceKey, Reading};
