// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Inference/persistence gateway
//!
//! Receives completed batches from the dispatcher and runs, best-effort and
//! in isolation:
//!
//! 1. device profile lookup (fallback profile on failure)
//! 2. calibration against the white standard
//! 3. classification and regression (sentinel on failure, independently)
//! 4. brix band mapping
//! 5. feedback publish to `/{warehouse}/{device}`
//! 6. result persistence
//!
//! Every external call is bounded by `call_timeout`. No step failure stops
//! the following steps, and nothing here can keep a session from resetting:
//! the dispatcher has already reset it before calling in.

use crate::bounded::{bounded_call, BoundedCallError};
use crate::calibration::{calibrate, channel_means};
use crate::error::{GatewayError, LookupError, PredictorError, PublishError, SinkError};
use crate::feedback::Prediction;
use crate::profile::{DeviceConfigLookup, DeviceProfile};
use crate::publisher::FeedbackPublisher;
use crate::registry::ModelRegistry;
use crate::sink::{BatchResult, ResultSink};
use chrono::Utc;
use ripeline_sessions::{BatchError, BatchHandler, CompletedBatch, DeviceKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Gateway tuning
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    /// Upper bound for each external call
    pub call_timeout: Duration,
    /// White standard of the fallback profile
    pub default_white_standard: Vec<f64>,
    /// Names for the leading channels in persisted results
    pub reading_names: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(2),
            default_white_standard: vec![1.0; 6],
            reading_names: ["temperature", "humidity", "gas1", "gas2", "gas3", "gas4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Everything one batch produced
#[derive(Debug)]
pub struct BatchReport {
    pub key: DeviceKey,
    pub profile: DeviceProfile,
    pub prediction: Prediction,
    pub feedback: String,
    pub record: BatchResult,
    /// Steps that fell back or failed, in order
    pub degraded: Vec<GatewayError>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// [`BatchHandler`] that classifies, publishes and persists batches
pub struct InferenceGateway {
    lookup: Arc<dyn DeviceConfigLookup>,
    models: Arc<ModelRegistry>,
    publisher: Arc<dyn FeedbackPublisher>,
    sink: Arc<dyn ResultSink>,
    settings: GatewaySettings,
}

impl InferenceGateway {
    pub fn new(
        lookup: Arc<dyn DeviceConfigLookup>,
        models: Arc<ModelRegistry>,
        publisher: Arc<dyn FeedbackPublisher>,
        sink: Arc<dyn ResultSink>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            lookup,
            models,
            publisher,
            sink,
            settings,
        }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Run every step for one batch
    pub fn process(&self, batch: &CompletedBatch) -> BatchReport {
        let key = &batch.key;
        let timeout = self.settings.call_timeout;
        let mut degraded = Vec::new();

        // 1. Device profile
        let profile = match self.lookup_profile(key) {
            Ok(profile) => profile,
            Err(e) => {
                error!("Failed to load device data for {} - {}; using default profile", key, e);
                degraded.push(e.into());
                DeviceProfile::fallback(&self.settings.default_white_standard)
            }
        };

        // 2. Calibration
        let (raw_means, normalized) = match calibrate(&batch.readings, &profile.white_standard) {
            Ok(calibrated) => (calibrated.raw_means, Some(calibrated.normalized)),
            Err(e) => {
                error!("Calibration failed for {}: {}; predictors skipped", key, e);
                degraded.push(e.into());
                (channel_means(&batch.readings).unwrap_or_default(), None)
            }
        };

        // 3. Predictors, each isolated
        let models = self.models.resolve(&profile.fruit, &profile.variety);
        let (score, brix) = match normalized {
            Some(input) => {
                let score = self.classify(Arc::clone(&models.classifier), input.clone());
                let brix = self.regress(Arc::clone(&models.regressor), input);
                (
                    keep_ok(score, key, "Status classification", &mut degraded),
                    keep_ok(brix, key, "Brix prediction", &mut degraded),
                )
            }
            None => (None, None),
        };

        // 4. Band + feedback text
        let prediction = Prediction::new(score, brix);
        let feedback = prediction.feedback_message();
        info!(
            "Device {} ({}/{}): {}",
            key, profile.fruit, profile.variety, feedback
        );

        // 5. Publish
        let publisher = Arc::clone(&self.publisher);
        let topic = batch.feedback_topic.clone();
        let message = feedback.clone();
        let published = bounded_call(timeout, move || publisher.publish(&topic, &message))
            .unwrap_or_else(|e| {
                Err(match e {
                    BoundedCallError::TimedOut(d) => PublishError::Timeout(d),
                    BoundedCallError::Aborted => PublishError::Failed {
                        topic: batch.feedback_topic.clone(),
                        reason: "publisher aborted".to_string(),
                    },
                })
            });
        if let Err(e) = published {
            error!("Failed to publish feedback for {}: {}", key, e);
            degraded.push(e.into());
        }

        // 6. Persist
        let record = BatchResult::new(
            key,
            &raw_means,
            &self.settings.reading_names,
            &prediction,
            &profile,
            Utc::now(),
        );
        let sink = Arc::clone(&self.sink);
        let to_store = record.clone();
        let stored = bounded_call(timeout, move || sink.store(&to_store)).unwrap_or_else(|e| {
            Err(match e {
                BoundedCallError::TimedOut(d) => SinkError::Timeout(d),
                BoundedCallError::Aborted => SinkError::Aborted,
            })
        });
        if let Err(e) = stored {
            error!("Failed to store result for {}: {}", key, e);
            degraded.push(e.into());
        }

        BatchReport {
            key: key.clone(),
            profile,
            prediction,
            feedback,
            record,
            degraded,
        }
    }

    fn lookup_profile(&self, key: &DeviceKey) -> Result<DeviceProfile, LookupError> {
        let lookup = Arc::clone(&self.lookup);
        let owned_key = key.clone();
        bounded_call(self.settings.call_timeout, move || lookup.lookup(&owned_key)).unwrap_or_else(
            |e| {
                Err(match e {
                    BoundedCallError::TimedOut(d) => LookupError::Timeout(d),
                    BoundedCallError::Aborted => LookupError::Backend("lookup aborted".to_string()),
                })
            },
        )
    }

    fn classify(
        &self,
        classifier: Arc<dyn crate::models::ScorePredictor>,
        input: Vec<f64>,
    ) -> Result<u8, PredictorError> {
        let name = classifier.describe();
        let score = bounded_call(self.settings.call_timeout, move || classifier.classify(&input))
            .unwrap_or_else(|e| Err(predictor_call_error(e, &name)))?;

        if !(0.0..=100.0).contains(&score) {
            return Err(PredictorError::OutOfRange(score));
        }
        // Truncate, as a probability of 0.876 reads as 87
        Ok(score.floor() as u8)
    }

    fn regress(
        &self,
        regressor: Arc<dyn crate::models::ValuePredictor>,
        input: Vec<f64>,
    ) -> Result<f64, PredictorError> {
        let name = regressor.describe();
        bounded_call(self.settings.call_timeout, move || regressor.regress(&input))
            .unwrap_or_else(|e| Err(predictor_call_error(e, &name)))
    }
}

fn predictor_call_error(e: BoundedCallError, name: &str) -> PredictorError {
    match e {
        BoundedCallError::TimedOut(d) => PredictorError::Timeout(d),
        BoundedCallError::Aborted => PredictorError::Unavailable(format!("{} (aborted)", name)),
    }
}

fn keep_ok<T>(
    result: Result<T, PredictorError>,
    key: &DeviceKey,
    step: &str,
    degraded: &mut Vec<GatewayError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!("{} failed for {} - {}", step, key, e);
            degraded.push(e.into());
            None
        }
    }
}

impl BatchHandler for InferenceGateway {
    fn handle_batch(&self, batch: CompletedBatch) -> Result<(), BatchError> {
        let report = self.process(&batch);
        if report.is_clean() {
            debug!("Batch for {} fully processed", report.key);
            return Ok(());
        }

        let steps: Vec<String> = report.degraded.iter().map(|e| e.to_string()).collect();
        Err(BatchError::Failed(format!(
            "{} step(s) degraded: {}",
            steps.len(),
            steps.join("; ")
        )))
    }
}
