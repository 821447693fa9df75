//! Error types for the session core

use thiserror::Error;

/// Errors returned to callers of [`IngestDispatcher::handle_message`](crate::IngestDispatcher::handle_message)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Payload could not be parsed; no session was touched
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
}

/// Failure reported by a [`BatchHandler`](crate::BatchHandler)
///
/// Never propagated past the dispatcher: it is logged and counted, and the
/// session has already been reset by the time it is observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("Batch handler failed: {0}")]
    Failed(String),

    #[error("Batch handler panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
