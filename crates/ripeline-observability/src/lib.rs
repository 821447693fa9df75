// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Logging set-up for ripeline binaries
//!
//! Library crates only emit `tracing` events. A binary calls [`init_logging`]
//! once and keeps the returned guard alive; per-crate verbosity comes from
//! `--debug-<crate>` flags or `RIPELINE_DEBUG`.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Crates that get their own log file and debug flag
pub const KNOWN_CRATES: &[&str] = &[
    "ripeline-config",
    "ripeline-transports",
    "ripeline-sessions",
    "ripeline-inference",
    "ripeline-ingest",
];

/// `ripeline-sessions` -> `ripeline_sessions`
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_target() {
        assert_eq!(crate_target("ripeline-sessions"), "ripeline_sessions");
    }
}
