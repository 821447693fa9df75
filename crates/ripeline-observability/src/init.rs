// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Subscriber installation
//!
//! Console output always; with file logging each process run gets its own
//! `run_<timestamp>` folder holding one JSON file per crate plus a combined
//! `ripeline.log`. Old run folders are pruned on start-up.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::LoggingOptions;
use crate::{crate_target, KNOWN_CRATES};

const RUN_PREFIX: &str = "run_";
const RUN_STAMP: &str = "%Y%m%d_%H%M%S";
const COMBINED_LOG: &str = "ripeline.log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Holds the file writers open; drop it last
pub struct LoggingGuard {
    _writers: Vec<WorkerGuard>,
    run_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// `None` when file logging is off
    pub fn log_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }
}

fn filter_from(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).with_context(|| format!("Invalid log filter: {}", directives))
}

fn json_file_layer<S>(dir: &Path, file_name: &str, filter: EnvFilter) -> (BoxedLayer<S>, WorkerGuard)
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, file_name));
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter)
        .boxed();
    (layer, guard)
}

/// Installs the global subscriber
///
/// ```text
/// logs/run_20250101_120000/
///     ripeline-sessions.log     debug and up from that crate only
///     ripeline-inference.log
///     ...
///     ripeline.log              everything the console shows
/// ```
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    if !options.file_logging {
        init_console_logging(debug_flags)?;
        return Ok(LoggingGuard {
            _writers: Vec::new(),
            run_dir: None,
        });
    }

    let now = Utc::now();
    let run_dir = options
        .log_dir
        .join(format!("{}{}", RUN_PREFIX, now.format(RUN_STAMP)));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create log directory: {}", run_dir.display()))?;
    prune_runs(&options.log_dir, options.retention_days, options.retention_runs, now)?;

    let directives = debug_flags.to_filter_string();
    let mut layers: Vec<BoxedLayer<Registry>> = Vec::with_capacity(KNOWN_CRATES.len() + 2);
    let mut writers = Vec::with_capacity(KNOWN_CRATES.len() + 1);

    layers.push(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(filter_from(&directives)?)
            .boxed(),
    );

    for name in KNOWN_CRATES {
        let only_this_crate = filter_from(&format!("{}=debug", crate_target(name)))?;
        let (layer, guard) = json_file_layer(&run_dir, &format!("{}.log", name), only_this_crate);
        layers.push(layer);
        writers.push(guard);
    }

    let (combined, guard) = json_file_layer(&run_dir, COMBINED_LOG, filter_from(&directives)?);
    layers.push(combined);
    writers.push(guard);

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        _writers: writers,
        run_dir: Some(run_dir),
    })
}

/// Console output only, for tools and tests
pub fn init_console_logging(debug_flags: &CrateDebugFlags) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_from(&debug_flags.to_filter_string())?)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install console logger: {}", e))
}

fn run_started(dir: &Path) -> Option<DateTime<Utc>> {
    let stamp = dir.file_name()?.to_str()?.strip_prefix(RUN_PREFIX)?;
    NaiveDateTime::parse_from_str(stamp, RUN_STAMP)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Drops run folders older than `max_age_days`, then all but the newest
/// `max_runs`. Directories not named like a run are left alone.
fn prune_runs(base: &Path, max_age_days: u64, max_runs: usize, now: DateTime<Utc>) -> Result<()> {
    if !base.is_dir() {
        return Ok(());
    }

    let mut runs = Vec::new();
    for entry in std::fs::read_dir(base)? {
        let path = entry?.path();
        if path.is_dir() {
            if let Some(started) = run_started(&path) {
                runs.push((started, path));
            }
        }
    }
    // newest first
    runs.sort_by(|a, b| b.0.cmp(&a.0));

    // capped so the subtraction cannot overflow
    let oldest_allowed = now - chrono::Duration::days(max_age_days.min(365_000) as i64);
    let (fresh, expired): (Vec<_>, Vec<_>) = runs
        .into_iter()
        .partition(|(started, _)| *started >= oldest_allowed);
    let doomed = expired.iter().chain(fresh.iter().skip(max_runs));

    for (_, path) in doomed {
        if let Err(e) = std::fs::remove_dir_all(path) {
            eprintln!("Warning: could not remove log folder {}: {}", path.display(), e);
        }
    }
    Ok(())
}
