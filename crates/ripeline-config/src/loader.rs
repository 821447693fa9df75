// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Loading `ripeline.toml` and layering overrides on top
//!
//! Precedence, lowest first: file, `RIPELINE_<KEY>` environment variables,
//! `--set key=value` arguments. Both override layers share one key table.

use crate::{ConfigError, ConfigResult, RipelineConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "ripeline.toml";
const CONFIG_PATH_ENV: &str = "RIPELINE_CONFIG_PATH";
const PARENT_SEARCH_DEPTH: usize = 5;

/// Keys accepted by [`apply_override`]
pub const OVERRIDE_KEYS: &[&str] = &[
    "log_level",
    "batch_size",
    "timeout_secs",
    "supervisor_tick_ms",
    "deadline_mode",
    "subscribe_address",
    "publish_address",
    "reading_topic",
    "status_topic",
    "receive_poll_ms",
    "send_timeout_ms",
    "call_timeout_ms",
    "model_dir",
    "results_path",
    "log_dir",
    "file_logging",
    "retention_days",
    "retention_runs",
];

/// `$RIPELINE_CONFIG_PATH` if set, else `./ripeline.toml` or the first one
/// found in up to five parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(explicit) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(explicit);
        return if path.is_file() {
            Ok(path)
        } else {
            Err(ConfigError::FileNotFound(format!(
                "{} points at {}, which does not exist",
                CONFIG_PATH_ENV,
                path.display()
            )))
        };
    }

    let candidates: Vec<PathBuf> = env::current_dir()
        .map(|cwd| {
            cwd.ancestors()
                .take(PARENT_SEARCH_DEPTH + 1)
                .map(|dir| dir.join(CONFIG_FILE_NAME))
                .collect()
        })
        .unwrap_or_default();

    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        return Ok(found.clone());
    }

    let searched: Vec<String> = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    Err(ConfigError::FileNotFound(format!(
        "{} (or set {})",
        searched.join(", "),
        CONFIG_PATH_ENV
    )))
}

/// Parses the file, then applies environment and CLI overrides
///
/// A CLI override that does not parse is an error; a bad environment value
/// is skipped. Does not validate; call [`crate::validate_config`] afterwards.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<RipelineConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let mut config: RipelineConfig = toml::from_str(&fs::read_to_string(&path)?)?;
    apply_environment_overrides(&mut config);
    if let Some(cli_args) = cli_args {
        let rejected = apply_cli_overrides(&mut config, cli_args);
        if !rejected.is_empty() {
            return Err(ConfigError::InvalidValue(format!("override {}", rejected.join(", "))));
        }
    }
    Ok(config)
}

/// Sets one field by its flat key, e.g. `("batch_size", "4")`
pub fn apply_override(config: &mut RipelineConfig, key: &str, value: &str) -> ConfigResult<()> {
    fn parsed<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, value)))
    }

    match key {
        "log_level" => config.system.log_level = value.to_string(),
        "batch_size" => config.sessions.batch_size = parsed(key, value)?,
        "timeout_secs" => config.sessions.timeout_secs = parsed(key, value)?,
        "supervisor_tick_ms" => config.sessions.supervisor_tick_ms = parsed(key, value)?,
        "deadline_mode" => config.sessions.deadline_mode = value.trim().to_lowercase(),
        "subscribe_address" => config.transport.subscribe_address = value.to_string(),
        "publish_address" => config.transport.publish_address = value.to_string(),
        "reading_topic" => config.transport.reading_topic = value.to_string(),
        "status_topic" => config.transport.status_topic = value.to_string(),
        "receive_poll_ms" => config.transport.receive_poll_ms = parsed(key, value)?,
        "send_timeout_ms" => config.transport.send_timeout_ms = parsed(key, value)?,
        "call_timeout_ms" => config.gateway.call_timeout_ms = parsed(key, value)?,
        "model_dir" => config.models.model_dir = PathBuf::from(value),
        "results_path" => config.storage.results_path = PathBuf::from(value),
        "log_dir" => config.logging.log_dir = PathBuf::from(value),
        "file_logging" => {
            config.logging.file_logging = matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
        }
        "retention_days" => config.logging.retention_days = parsed(key, value)?,
        "retention_runs" => config.logging.retention_runs = parsed(key, value)?,
        other => return Err(ConfigError::InvalidValue(format!("unknown key '{}'", other))),
    }
    Ok(())
}

/// `RIPELINE_BATCH_SIZE=4` and so on for every key in [`OVERRIDE_KEYS`].
/// Unparsable values leave the field unchanged.
pub fn apply_environment_overrides(config: &mut RipelineConfig) {
    for key in OVERRIDE_KEYS {
        if let Ok(value) = env::var(format!("RIPELINE_{}", key.to_uppercase())) {
            let _ = apply_override(config, key, &value);
        }
    }
}

/// Applies every pair and returns the keys that were rejected
pub fn apply_cli_overrides(config: &mut RipelineConfig, cli_args: &HashMap<String, String>) -> Vec<String> {
    let mut rejected: Vec<String> = cli_args
        .iter()
        .filter(|(key, value)| apply_override(config, key, value).is_err())
        .map(|(key, _)| key.clone())
        .collect();
    rejected.sort();
    rejected
}
