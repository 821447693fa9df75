// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `ripeline.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RipelineConfig {
    pub system: SystemConfig,
    pub sessions: SessionsConfig,
    pub transport: TransportConfig,
    pub gateway: GatewayConfig,
    pub calibration: CalibrationConfig,
    pub models: ModelsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub devices: Vec<DeviceEntry>,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Per-device batching and timeout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Readings per batch before inference is triggered
    pub batch_size: usize,
    /// Seconds an incomplete batch may wait before it is evicted
    pub timeout_secs: f64,
    /// Interval between timeout scans in milliseconds
    pub supervisor_tick_ms: u64,
    /// "arrival" (deadline counted from the first reading) or "scan"
    /// (deadline counted from the scan that first noticed the session)
    pub deadline_mode: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            batch_size: 2,
            timeout_secs: 10.0,
            supervisor_tick_ms: 250,
            deadline_mode: "arrival".to_string(),
        }
    }
}

/// Upper bound for `sessions.timeout_secs` (one year)
pub const MAX_TIMEOUT_SECS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

impl SessionsConfig {
    /// Values `validate_config` would reject saturate instead of panicking
    pub fn timeout(&self) -> Duration {
        let max = Duration::from_secs_f64(MAX_TIMEOUT_SECS);
        match Duration::try_from_secs_f64(self.timeout_secs) {
            Ok(timeout) => timeout.min(max),
            Err(_) if self.timeout_secs > 0.0 => max,
            Err(_) => Duration::ZERO,
        }
    }

    pub fn supervisor_tick(&self) -> Duration {
        Duration::from_millis(self.supervisor_tick_ms)
    }
}

/// Publish/subscribe transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// SUB endpoint the device readings arrive on
    pub subscribe_address: String,
    pub reading_topic: String,
    pub status_topic: String,
    /// PUB endpoint feedback is published on
    pub publish_address: String,
    pub receive_poll_ms: u64,
    pub send_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            subscribe_address: "tcp://127.0.0.1:1883".to_string(),
            reading_topic: "/proto/out".to_string(),
            status_topic: "/update/out".to_string(),
            publish_address: "tcp://*:1884".to_string(),
            receive_poll_ms: 500,
            send_timeout_ms: 1000,
        }
    }
}

/// Inference/persistence gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Upper bound for any single external call (lookup, predict, publish, store)
    pub call_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 2000,
        }
    }
}

impl GatewayConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Calibration defaults used when a device has no registered profile
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub default_white_standard: Vec<f64>,
    /// Names of the raw reading channels, in payload order
    pub reading_names: Vec<String>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            default_white_standard: vec![1.0; 6],
            reading_names: ["temperature", "humidity", "gas1", "gas2", "gas3", "gas4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Model file locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub model_dir: PathBuf,
    pub default_brix_model: String,
    pub default_classifier_model: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            default_brix_model: "default_brix.json".to_string(),
            default_classifier_model: "default_clf.json".to_string(),
        }
    }
}

/// Result persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub results_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("data/results.jsonl"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            retention_days: 30,
            retention_runs: 10,
            file_logging: true,
        }
    }
}

/// Static device directory entry (`[[devices]]`)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceEntry {
    pub warehouse_id: String,
    pub device_id: String,
    pub fruit: String,
    pub variety: String,
    pub white_standard: Vec<f64>,
    #[serde(default = "default_label")]
    pub batch_number: String,
    #[serde(default = "default_label")]
    pub vendor_code: String,
}

fn default_label() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion_never_panics() {
        let mut sessions = SessionsConfig::default();
        assert_eq!(sessions.timeout(), Duration::from_secs(10));

        sessions.timeout_secs = 1e20;
        assert_eq!(sessions.timeout(), Duration::from_secs_f64(MAX_TIMEOUT_SECS));

        sessions.timeout_secs = f64::INFINITY;
        assert_eq!(sessions.timeout(), Duration::from_secs_f64(MAX_TIMEOUT_SECS));

        sessions.timeout_secs = f64::NAN;
        assert_eq!(sessions.timeout(), Duration::ZERO);
        sessions.timeout_secs = -3.0;
        assert_eq!(sessions.timeout(), Duration::ZERO);
    }
}
