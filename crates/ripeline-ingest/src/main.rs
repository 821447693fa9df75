// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::Parser;
use ripeline_config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, ConfigError,
    RipelineConfig, OVERRIDE_KEYS,
};
use ripeline_inference::TransportFeedbackPublisher;
use ripeline_ingest::wiring::logging_options;
use ripeline_ingest::{run_receive_loop, Pipeline};
use ripeline_observability::{debug_flags_help, init_logging, parse_debug_flags};
use ripeline_transports::zmq::{ZmqPub, ZmqSub};
use ripeline_transports::{ClientConfig, ServerConfig, Transport};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Ripeline ingestion service - per-device batching, timeout eviction and
/// inference dispatch for ripeness sensors
#[derive(Parser, Debug)]
#[command(name = "ripeline-ingest", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Path to ripeline.toml (searched in the usual places when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override a configuration value, e.g. `--set batch_size=4`
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    overrides: Vec<(String, String)>,

    /// Load and validate the configuration, then exit
    #[arg(long, default_value_t = false)]
    check_config: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if !OVERRIDE_KEYS.contains(&key) {
        return Err(format!("unknown key '{}' (one of: {})", key, OVERRIDE_KEYS.join(", ")));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn main() -> Result<()> {
    // --debug-* flags belong to the logging layer, not to clap
    let args = Args::parse_from(std::env::args().filter(|arg| !arg.starts_with("--debug-")));
    let overrides: HashMap<String, String> = args.overrides.iter().cloned().collect();

    let (config, used_defaults) = match load_config(args.config.as_deref(), Some(&overrides)) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound(_)) if args.config.is_none() => {
            let mut config = RipelineConfig::default();
            apply_environment_overrides(&mut config);
            let rejected = apply_cli_overrides(&mut config, &overrides);
            if !rejected.is_empty() {
                anyhow::bail!("Invalid override value for: {}", rejected.join(", "));
            }
            (config, true)
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    validate_config(&config).context("Invalid configuration")?;

    if args.check_config {
        println!("Configuration OK");
        return Ok(());
    }

    let debug_flags = parse_debug_flags().with_base_level(config.system.log_level.clone());
    let _logging = init_logging(&debug_flags, &logging_options(&config.logging))?;

    info!("ripeline-ingest v{}", env!("CARGO_PKG_VERSION"));
    if used_defaults {
        warn!("No ripeline.toml found; running with built-in defaults");
    }
    info!(
        "Batch size {}, timeout {:.1}s, deadline mode {}",
        config.sessions.batch_size, config.sessions.timeout_secs, config.sessions.deadline_mode
    );

    run(&config)
}

fn run(config: &RipelineConfig) -> Result<()> {
    let context = Arc::new(zmq::Context::new());
    let transport = &config.transport;

    let mut server_config = ServerConfig::new(transport.publish_address.clone());
    server_config.base.send_timeout = Some(Duration::from_millis(transport.send_timeout_ms));
    let feedback_socket = ZmqPub::new(Arc::clone(&context), server_config)?;
    let publisher = Arc::new(TransportFeedbackPublisher::new(feedback_socket)?);
    info!("Publishing feedback on {}", transport.publish_address);

    let mut pipeline = Pipeline::build(config, publisher.clone())?;

    let client_config = ClientConfig::new(transport.subscribe_address.clone())
        .with_subscription(transport.reading_topic.clone())
        .with_subscription(transport.status_topic.clone());
    let mut subscriber = ZmqSub::new(context, client_config)?;
    subscriber.start()?;
    info!(
        "Subscribed to {} and {} on {}",
        transport.reading_topic, transport.status_topic, transport.subscribe_address
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        r.store(false, Ordering::SeqCst);
    })?;

    pipeline.start();
    info!("Ingestion running (Press Ctrl+C to stop)...");

    let outcome = run_receive_loop(&subscriber, pipeline.router(), &running, transport.receive_poll_ms);

    pipeline.shutdown();
    if let Err(e) = subscriber.stop() {
        warn!("Failed to stop subscriber: {}", e);
    }
    if let Err(e) = publisher.shutdown() {
        warn!("Failed to stop feedback publisher: {}", e);
    }

    match outcome {
        Ok(received) => {
            info!("Shutdown complete ({} message(s) received)", received);
            Ok(())
        }
        Err(e) => {
            error!("Receive loop ended: {}", e);
            Err(e.into())
        }
    }
}
