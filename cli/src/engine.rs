// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Embedded engine bootstrap shared by every CLI command.
//!
//! Each command builds the full engine in-process from the configuration
//! file; there is no daemon delegation. `serve` mounts the same state
//! behind the HTTP router.

use anyhow::{Context, Result};
use opspulse_core::application::chain::ChainExecutor;
use opspulse_core::application::execution::ExecutionEngine;
use opspulse_core::application::health::HealthAggregator;
use opspulse_core::config::EngineConfig;
use opspulse_core::infrastructure::catalog::ToolCatalog;
use opspulse_core::infrastructure::matrix_store::MatrixStore;
use opspulse_core::infrastructure::probes::ProbeRegistry;
use opspulse_core::infrastructure::runtime::ProcessRuntime;
use opspulse_core::presentation::api::AppState;
use std::path::Path;
use std::sync::Arc;

pub struct Services {
    pub config: EngineConfig,
    pub state: Arc<AppState>,
}

/// Build the full engine from a configuration file.
///
/// Must run inside a Tokio runtime: opening the matrix store spawns its
/// owner task.
pub fn bootstrap(config_path: &Path) -> Result<Services> {
    let config = EngineConfig::load(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    let catalog = Arc::new(ToolCatalog::load_or_empty(&config.catalog_path));
    let runtime = Arc::new(ProcessRuntime::new(config.capture_limit_bytes));
    let engine = Arc::new(ExecutionEngine::new(catalog, runtime));
    let chains = Arc::new(ChainExecutor::new(engine.clone(), config.chain_task_timeout()));

    let store = MatrixStore::open(config.matrix_path.clone(), config.trend_threshold);
    let probes = Arc::new(ProbeRegistry::from_config(&config.probes));
    let aggregator = Arc::new(HealthAggregator::new(
        probes.clone(),
        config.health_batch_size,
        config.health_timeout(),
    ));

    let state = Arc::new(AppState {
        engine,
        chains,
        aggregator,
        probes,
        store,
        default_tool_timeout: config.default_tool_timeout(),
    });

    Ok(Services { config, state })
}
