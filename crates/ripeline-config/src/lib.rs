// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the ripeline ingestion service
//!
//! Every field has a default, so an empty `ripeline.toml` is a working local
//! setup. Values are layered file, then environment, then CLI.
//!
//! ```rust,no_run
//! use ripeline_config::{load_config, validate_config};
//!
//! let config = load_config(None, None)?;
//! validate_config(&config)?;
//! println!("{} readings per batch", config.sessions.batch_size);
//! # Ok::<(), ripeline_config::ConfigError>(())
//! ```

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, apply_override, find_config_file,
    load_config, OVERRIDE_KEYS,
};
pub use types::*;
pub use validation::{find_problems, validate_config, ConfigValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    ParseError(String),

    #[error("Configuration is invalid:\n{0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
