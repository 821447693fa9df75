// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Status flipping
//!
//! An operator (or the device itself) sends `"warehouseId,deviceId"` on the
//! status topic. The latest persisted status of that device is flipped from
//! `0` to `1` (any other value is kept), the amendment is appended and the
//! resulting status is published back to `/{warehouseId}/{deviceId}`.
//! A device without any persisted result gets `-1`.

use crate::bounded::{bounded_call, BoundedCallError};
use crate::error::{PublishError, SinkError, StatusError};
use crate::feedback::UNAVAILABLE_SCORE;
use crate::publisher::FeedbackPublisher;
use crate::sink::StatusStore;
use ripeline_sessions::DeviceKey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Handles status-flip requests
pub struct StatusService {
    store: Arc<dyn StatusStore>,
    publisher: Arc<dyn FeedbackPublisher>,
    call_timeout: Duration,
}

impl StatusService {
    pub fn new(
        store: Arc<dyn StatusStore>,
        publisher: Arc<dyn FeedbackPublisher>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            call_timeout,
        }
    }

    /// Process one request and return the status that was published
    pub fn handle_status_message(&self, payload: &[u8]) -> Result<i64, StatusError> {
        let key = parse_status_request(payload)?;

        let store = Arc::clone(&self.store);
        let lookup_key = key.clone();
        let latest = bounded_call(self.call_timeout, move || store.latest_status(&lookup_key))
            .unwrap_or_else(|e| Err(sink_call_error(e)))?;

        let status = match latest {
            Some(record) => {
                let flipped = if record.status == 0 { 1 } else { record.status };

                let store = Arc::clone(&self.store);
                let update_key = key.clone();
                bounded_call(self.call_timeout, move || {
                    store.update_status(&update_key, &record.device_info, flipped)
                })
                .unwrap_or_else(|e| Err(sink_call_error(e)))?;

                info!("Status for {} set to {}", key, flipped);
                flipped
            }
            None => {
                warn!("No stored result for {}; reporting unavailable status", key);
                UNAVAILABLE_SCORE
            }
        };

        let publisher = Arc::clone(&self.publisher);
        let topic = key.feedback_topic();
        let message = status.to_string();
        let publish_topic = topic.clone();
        bounded_call(self.call_timeout, move || publisher.publish(&publish_topic, &message))
            .unwrap_or_else(|e| {
                Err(match e {
                    BoundedCallError::TimedOut(d) => PublishError::Timeout(d),
                    BoundedCallError::Aborted => PublishError::Failed {
                        topic,
                        reason: "publisher aborted".to_string(),
                    },
                })
            })?;

        Ok(status)
    }
}

/// `"warehouseId,deviceId[,...]"` to a device key
pub fn parse_status_request(payload: &[u8]) -> Result<DeviceKey, StatusError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| StatusError::MalformedRequest(format!("not UTF-8: {}", e)))?;

    let mut fields = text.trim().split(',').map(str::trim);
    match (fields.next(), fields.next()) {
        (Some(w), Some(d)) if !w.is_empty() && !d.is_empty() => Ok(DeviceKey::new(w, d)),
        _ => Err(StatusError::MalformedRequest(format!(
            "expected \"warehouseId,deviceId\", got {:?}",
            text
        ))),
    }
}

fn sink_call_error(e: BoundedCallError) -> SinkError {
    match e {
        BoundedCallError::TimedOut(d) => SinkError::Timeout(d),
        BoundedCallError::Aborted => SinkError::Aborted,
    }
}
