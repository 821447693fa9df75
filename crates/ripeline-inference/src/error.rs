//! Error types for the inference/persistence gateway
//!
//! Every error here is recovered inside the gateway: lookups fall back to a
//! default profile, predictors to a sentinel, sink and publish failures are
//! logged. None of them prevents a session reset.

use thiserror::Error;

/// Device configuration could not be resolved (ConfigLookupFailure)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("Device {0} is not registered")]
    UnknownDevice(String),

    #[error("Device lookup failed: {0}")]
    Backend(String),

    #[error("Device lookup timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Raw readings could not be normalised against the white standard
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("Batch contains no readings")]
    EmptyBatch,

    #[error("Readings have unequal widths ({expected} vs {found})")]
    UnequalWidths { expected: usize, found: usize },

    #[error("Readings have {channels} channel(s) but the white standard needs {required}")]
    TooFewChannels { channels: usize, required: usize },

    #[error("White standard entry {index} is zero or not finite")]
    InvalidStandard { index: usize },
}

/// A predictor could not produce a value (PredictorFailure)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("No model available for {0}")]
    Unavailable(String),

    #[error("Model expects {expected} input(s), got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Prediction is out of range: {0}")]
    OutOfRange(f64),

    #[error("Prediction timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Failed to load model {path}: {reason}")]
    Load { path: String, reason: String },
}

/// A result could not be stored or read back (PersistenceFailure)
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Result sink timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Result sink call aborted")]
    Aborted,
}

/// Feedback could not be published
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    #[error("Publish to {topic} failed: {reason}")]
    Failed { topic: String, reason: String },

    #[error("Publish timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Status-flip request failures
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Malformed status request: {0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Any step failure inside a dispatch, used for reporting
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}
