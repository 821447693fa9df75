//! Options for [`crate::init_logging`]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Parent of the `run_<timestamp>` folders
    pub log_dir: PathBuf,
    pub retention_days: u64,
    /// Newest run folders kept after the age cut
    pub retention_runs: usize,
    /// `false` logs to the console only
    pub file_logging: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
            file_logging: true,
        }
    }
}
