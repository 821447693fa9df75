// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! # ripeline-inference
//!
//! Turns completed reading batches into a ripeness score, a predicted brix
//! value and a brix band, publishes feedback to the device and persists the
//! result.
//!
//! The [`InferenceGateway`] implements
//! [`ripeline_sessions::BatchHandler`], so it plugs straight into an
//! [`ripeline_sessions::IngestDispatcher`]. All collaborators sit behind
//! traits:
//!
//! - [`DeviceConfigLookup`]: device -> fruit, variety, white standard
//! - [`ScorePredictor`] / [`ValuePredictor`]: resolved through [`ModelRegistry`]
//! - [`FeedbackPublisher`]: any transport publisher
//! - [`ResultSink`] / [`StatusStore`]: persistence and status flipping

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod band;
pub mod bounded;
pub mod calibration;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod models;
pub mod profile;
pub mod publisher;
pub mod registry;
pub mod sink;
pub mod status;

pub use band::BrixBand;
pub use bounded::{bounded_call, BoundedCallError};
pub use calibration::{calibrate, channel_means, normalize, Calibrated};
pub use error::{
    CalibrationError, GatewayError, LookupError, PredictorError, PublishError, SinkError,
    StatusError,
};
pub use feedback::{round2, Prediction, UNAVAILABLE_BRIX, UNAVAILABLE_SCORE};
pub use gateway::{BatchReport, GatewaySettings, InferenceGateway};
pub use models::{LinearModel, LinearWeights, LogisticModel, ScorePredictor, UnavailableModel, ValuePredictor};
pub use profile::{DeviceConfigLookup, DeviceProfile, StaticDeviceDirectory, DEFAULT_LABEL};
pub use publisher::{FeedbackPublisher, TransportFeedbackPublisher};
pub use registry::{ModelPair, ModelRegistry, ModelRegistryConfig};
pub use sink::{
    device_info, BatchResult, JsonlResultSink, MemoryResultSink, ResultSink, StatusAmendment,
    StatusRecord, StatusStore,
};
pub use status::{parse_status_request, StatusService};
