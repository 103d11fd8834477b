// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server mode

use anyhow::{Context, Result};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::info;

use crate::engine;
use opspulse_core::presentation::api;

pub async fn run(config_path: &Path, host: &str, port: u16) -> Result<()> {
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let services = engine::bootstrap(config_path)?;
    info!(
        tools = services.state.engine.catalog().len(),
        probes = services.state.probes.len(),
        "Engine initialized"
    );

    let app = api::app(services.state)
        .route("/metrics", get(move || async move { metrics_handle.render() }));

    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Opspulse listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}
