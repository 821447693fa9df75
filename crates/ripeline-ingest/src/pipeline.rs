// Copyright 2025 Ripeline Developers
// SPDX-License-Identifier: Apache-2.0

//! Assembled ingestion pipeline
//!
//! ```text
//! subscriber ─► IngestRouter ─┬─► IngestDispatcher ─► InferenceGateway ─► publisher / journal
//!                             └─► StatusService ─────────────────────────► publisher / journal
//!                  TimeoutSupervisor ─► SessionStore
//! ```

use crate::router::IngestRouter;
use crate::wiring::{device_directory, gateway_settings, registry_config, supervisor_settings};
use anyhow::{Context, Result};
use ripeline_config::RipelineConfig;
use ripeline_inference::{
    DeviceConfigLookup, FeedbackPublisher, InferenceGateway, JsonlResultSink, ModelRegistry,
    StatusService,
};
use ripeline_sessions::{
    Clock, IngestDispatcher, IngestStats, SessionStore, StatsSnapshot, SystemClock,
    TimeoutSupervisor,
};
use std::sync::Arc;
use tracing::info;

pub struct Pipeline {
    router: IngestRouter,
    supervisor: TimeoutSupervisor,
    stats: Arc<IngestStats>,
    sink: Arc<JsonlResultSink>,
}

impl Pipeline {
    /// Build every component from configuration, on the system clock
    pub fn build(config: &RipelineConfig, publisher: Arc<dyn FeedbackPublisher>) -> Result<Self> {
        Self::build_with_clock(config, publisher, Arc::new(SystemClock))
    }

    pub fn build_with_clock(
        config: &RipelineConfig,
        publisher: Arc<dyn FeedbackPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let directory = Arc::new(device_directory(&config.devices));
        info!("Device directory loaded ({} device(s))", directory.len());

        let models = Arc::new(ModelRegistry::load(
            &registry_config(&config.models),
            directory.varieties(),
        ));

        let sink = Arc::new(
            JsonlResultSink::open(&config.storage.results_path).with_context(|| {
                format!(
                    "Failed to open result journal {}",
                    config.storage.results_path.display()
                )
            })?,
        );

        let gateway = InferenceGateway::new(
            directory,
            models,
            Arc::clone(&publisher),
            sink.clone(),
            gateway_settings(config),
        );

        let stats = Arc::new(IngestStats::new());
        let store = Arc::new(SessionStore::new(config.sessions.batch_size));
        let dispatcher = Arc::new(
            IngestDispatcher::new(Arc::clone(&store), Arc::new(gateway), Arc::clone(&clock))
                .with_stats(Arc::clone(&stats)),
        );

        let supervisor = TimeoutSupervisor::with_stats(
            store,
            clock,
            supervisor_settings(&config.sessions)?,
            Arc::clone(&stats),
        );

        let status = StatusService::new(sink.clone(), publisher, config.gateway.call_timeout());
        let router = IngestRouter::new(
            dispatcher,
            status,
            config.transport.reading_topic.clone(),
            config.transport.status_topic.clone(),
        );

        Ok(Self {
            router,
            supervisor,
            stats,
            sink,
        })
    }

    pub fn router(&self) -> &IngestRouter {
        &self.router
    }

    pub fn supervisor(&self) -> &TimeoutSupervisor {
        &self.supervisor
    }

    pub fn journal(&self) -> &JsonlResultSink {
        &self.sink
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Start the timeout supervisor
    pub fn start(&mut self) {
        self.supervisor.start();
    }

    /// Stop the timeout supervisor and report the counters
    pub fn shutdown(&mut self) -> StatsSnapshot {
        self.supervisor.stop();
        let stats = self.stats();
        info!(
            "Ingestion stopped: accepted={} malformed={} dispatched={} handler_failures={} evictions={}",
            stats.accepted, stats.malformed, stats.dispatched, stats.handler_failures, stats.evictions
        );
        stats
    }
}
