// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Mapping from `ripeline.toml` sections to component settings
//!
//! The component crates do not depend on `ripeline-config`; this is the one
//! place that knows both sides.

use ripeline_config::{
    DeviceEntry, LoggingConfig, ModelsConfig, RipelineConfig, SessionsConfig,
};
use ripeline_inference::{DeviceProfile, GatewaySettings, ModelRegistryConfig, StaticDeviceDirectory};
use ripeline_observability::LoggingOptions;
use ripeline_sessions::{DeadlineMode, DeviceKey, SupervisorSettings};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WiringError {
    #[error("Invalid sessions.deadline_mode: {0}")]
    DeadlineMode(String),
}

pub fn supervisor_settings(sessions: &SessionsConfig) -> Result<SupervisorSettings, WiringError> {
    let deadline_mode: DeadlineMode = sessions
        .deadline_mode
        .parse()
        .map_err(WiringError::DeadlineMode)?;

    Ok(SupervisorSettings {
        timeout: sessions.timeout(),
        tick: sessions.supervisor_tick(),
        deadline_mode,
    })
}

pub fn gateway_settings(config: &RipelineConfig) -> GatewaySettings {
    GatewaySettings {
        call_timeout: config.gateway.call_timeout(),
        default_white_standard: config.calibration.default_white_standard.clone(),
        reading_names: config.calibration.reading_names.clone(),
    }
}

/// Static device directory from `[[devices]]`; later entries win
pub fn device_directory(devices: &[DeviceEntry]) -> StaticDeviceDirectory {
    let mut directory = StaticDeviceDirectory::new();
    for entry in devices {
        directory.insert(
            DeviceKey::new(entry.warehouse_id.clone(), entry.device_id.clone()),
            DeviceProfile {
                fruit: entry.fruit.clone(),
                variety: entry.variety.clone(),
                white_standard: entry.white_standard.clone(),
                batch_number: entry.batch_number.clone(),
                vendor_code: entry.vendor_code.clone(),
            },
        );
    }
    directory
}

pub fn registry_config(models: &ModelsConfig) -> ModelRegistryConfig {
    ModelRegistryConfig {
        model_dir: models.model_dir.clone(),
        default_brix_model: models.default_brix_model.clone(),
        default_classifier_model: models.default_classifier_model.clone(),
    }
}

pub fn logging_options(logging: &LoggingConfig) -> LoggingOptions {
    LoggingOptions {
        log_dir: logging.log_dir.clone(),
        retention_days: logging.retention_days,
        retention_runs: logging.retention_runs,
        file_logging: logging.file_logging,
    }
}
