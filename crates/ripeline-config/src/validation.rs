//! Consistency checks run after loading
//!
//! All problems are collected and reported together.

use crate::{ConfigError, ConfigResult, DeviceEntry, RipelineConfig, MAX_TIMEOUT_SECS};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("{field} is required")]
    MissingRequired { field: String },

    #[error("{field} {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("device {warehouse_id}/{device_id} is listed more than once")]
    DuplicateDevice { warehouse_id: String, device_id: String },
}

#[derive(Default)]
struct Problems(Vec<ConfigValidationError>);

impl Problems {
    fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(ConfigValidationError::MissingRequired {
                field: field.to_string(),
            });
        }
    }

    fn check(&mut self, ok: bool, field: impl Into<String>, reason: &str) {
        if !ok {
            self.0.push(ConfigValidationError::InvalidValue {
                field: field.into(),
                reason: reason.to_string(),
            });
        }
    }

    fn white_standard(&mut self, field: String, standard: &[f64]) {
        self.check(!standard.is_empty(), field.clone(), "must not be empty");
        self.check(
            standard.iter().all(|v| v.is_finite() && *v != 0.0),
            field,
            "values must be finite and non-zero",
        );
    }
}

/// Every problem found, empty when the configuration is usable
pub fn find_problems(config: &RipelineConfig) -> Vec<ConfigValidationError> {
    let mut problems = Problems::default();
    let sessions = &config.sessions;
    let transport = &config.transport;

    problems.require("transport.subscribe_address", &transport.subscribe_address);
    problems.require("transport.publish_address", &transport.publish_address);
    problems.require("transport.reading_topic", &transport.reading_topic);
    problems.require("transport.status_topic", &transport.status_topic);
    problems.require("models.default_brix_model", &config.models.default_brix_model);
    problems.require(
        "models.default_classifier_model",
        &config.models.default_classifier_model,
    );

    problems.check(sessions.batch_size >= 1, "sessions.batch_size", "must be at least 1");
    problems.check(
        sessions.timeout_secs.is_finite() && sessions.timeout_secs > 0.0,
        "sessions.timeout_secs",
        "must be positive",
    );
    problems.check(
        sessions.timeout_secs.is_nan() || sessions.timeout_secs <= MAX_TIMEOUT_SECS,
        "sessions.timeout_secs",
        "must not exceed one year (31536000 seconds)",
    );
    problems.check(
        sessions.supervisor_tick_ms > 0,
        "sessions.supervisor_tick_ms",
        "must be positive",
    );
    problems.check(
        matches!(sessions.deadline_mode.as_str(), "arrival" | "scan"),
        "sessions.deadline_mode",
        "must be 'arrival' or 'scan'",
    );
    problems.check(
        transport.reading_topic != transport.status_topic,
        "transport.status_topic",
        "must differ from transport.reading_topic",
    );
    problems.check(
        config.gateway.call_timeout_ms > 0,
        "gateway.call_timeout_ms",
        "must be positive",
    );
    problems.white_standard(
        "calibration.default_white_standard".to_string(),
        &config.calibration.default_white_standard,
    );

    check_devices(&config.devices, &mut problems);
    problems.0
}

fn check_devices(devices: &[DeviceEntry], problems: &mut Problems) {
    let mut seen = HashSet::new();
    for (i, device) in devices.iter().enumerate() {
        problems.require(&format!("devices[{}].warehouse_id", i), &device.warehouse_id);
        problems.require(&format!("devices[{}].device_id", i), &device.device_id);
        problems.white_standard(format!("devices[{}].white_standard", i), &device.white_standard);

        if !seen.insert((device.warehouse_id.as_str(), device.device_id.as_str())) {
            problems.0.push(ConfigValidationError::DuplicateDevice {
                warehouse_id: device.warehouse_id.clone(),
                device_id: device.device_id.clone(),
            });
        }
    }
}

/// [`find_problems`] folded into a single [`ConfigError::ValidationError`]
pub fn validate_config(config: &RipelineConfig) -> ConfigResult<()> {
    let problems = find_problems(config);
    if problems.is_empty() {
        return Ok(());
    }
    let listing: Vec<String> = problems.iter().map(|p| format!("  - {}", p)).collect();
    Err(ConfigError::ValidationError(listing.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(warehouse_id: &str, device_id: &str) -> DeviceEntry {
        DeviceEntry {
            warehouse_id: warehouse_id.to_string(),
            device_id: device_id.to_string(),
            fruit: "mango".to_string(),
            variety: "alphonso".to_string(),
            white_standard: vec![1.0, 1.0],
            batch_number: "B1".to_string(),
            vendor_code: "V1".to_string(),
        }
    }

    fn fields(config: &RipelineConfig) -> Vec<String> {
        find_problems(config)
            .into_iter()
            .map(|problem| match problem {
                ConfigValidationError::MissingRequired { field } => field,
                ConfigValidationError::InvalidValue { field, .. } => field,
                ConfigValidationError::DuplicateDevice {
                    warehouse_id,
                    device_id,
                } => format!("{}/{}", warehouse_id, device_id),
            })
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&RipelineConfig::default()).is_ok());
    }

    #[test]
    fn test_session_ranges() {
        let mut config = RipelineConfig::default();
        config.sessions.batch_size = 0;
        config.sessions.timeout_secs = f64::NAN;
        config.sessions.deadline_mode = "eventually".to_string();

        assert_eq!(
            fields(&config),
            vec![
                "sessions.batch_size",
                "sessions.timeout_secs",
                "sessions.deadline_mode"
            ]
        );
    }

    #[test]
    fn test_timeout_upper_bound() {
        let mut config = RipelineConfig::default();
        config.sessions.timeout_secs = MAX_TIMEOUT_SECS;
        assert!(find_problems(&config).is_empty());

        for huge in [1e19, 1e20, f64::MAX] {
            config.sessions.timeout_secs = huge;
            assert_eq!(fields(&config), vec!["sessions.timeout_secs"], "{}", huge);
        }
    }

    #[test]
    fn test_topics() {
        let mut config = RipelineConfig::default();
        config.transport.reading_topic = String::new();
        assert_eq!(fields(&config), vec!["transport.reading_topic"]);

        config.transport.reading_topic = config.transport.status_topic.clone();
        assert_eq!(fields(&config), vec!["transport.status_topic"]);
    }

    #[test]
    fn test_device_entries() {
        let mut config = RipelineConfig::default();
        let mut zeroed = device("W1", "D1");
        zeroed.white_standard = vec![1.0, 0.0];
        config.devices = vec![zeroed, device("W1", "D1"), device("W1", "D2"), device(" ", "D3")];

        assert_eq!(
            fields(&config),
            vec!["devices[0].white_standard", "W1/D1", "devices[3].warehouse_id"]
        );
    }

    #[test]
    fn test_error_lists_every_problem() {
        let mut config = RipelineConfig::default();
        config.sessions.batch_size = 0;
        config.gateway.call_timeout_ms = 0;

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("sessions.batch_size must be at least 1"));
                assert!(msg.contains("gateway.call_timeout_ms must be positive"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
