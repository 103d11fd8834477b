// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! HTTP surface consumed by the dashboard collaborator.

use crate::application::chain::ChainExecutor;
use crate::application::execution::ExecutionEngine;
use crate::application::health::{HealthAggregator, HealthQuery};
use crate::application::probe_runner::ProbeRunner;
use crate::domain::chain::ChainTask;
use crate::domain::tool::{ExecutionRequest, ToolId};
use crate::infrastructure::matrix_store::MatrixStore;
use crate::infrastructure::probes::ProbeRegistry;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub engine: Arc<ExecutionEngine>,
    pub chains: Arc<ChainExecutor>,
    pub aggregator: Arc<HealthAggregator>,
    pub probes: Arc<ProbeRegistry>,
    pub store: MatrixStore,
    pub default_tool_timeout: Duration,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/tools/{id}/run", post(run_tool))
        .route("/api/v1/chains/run", post(run_chain))
        .route("/api/v1/health", get(health_query))
        .route("/api/v1/probes/{id}/check", post(run_probe_check))
        .route("/api/v1/matrix", get(matrix_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools: Vec<_> = state.engine.catalog().tools().cloned().collect();
    Json(json!({ "tools": tools }))
}

#[derive(Deserialize, Default)]
struct RunToolRequest {
    #[serde(default)]
    payload: serde_json::Value,
    timeout_ms: Option<u64>,
}

async fn run_tool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RunToolRequest>,
) -> impl IntoResponse {
    let timeout = body
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(state.default_tool_timeout);
    let result = state
        .engine
        .execute(ExecutionRequest {
            tool_id: ToolId::new(id),
            payload: body.payload,
            timeout,
        })
        .await;
    Json(result)
}

#[derive(Deserialize)]
struct RunChainRequest {
    tasks: Vec<ChainTask>,
}

async fn run_chain(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RunChainRequest>,
) -> impl IntoResponse {
    let report = state.chains.execute(body.tasks).await;
    Json(report)
}

async fn health_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    let report = state.aggregator.query(&query).await;
    Json(report)
}

async fn run_probe_check(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Some(probe) = state.probes.get(&id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no probe '{id}'") })),
        );
    };
    let runner = ProbeRunner::new(state.store.clone());
    match runner.run_check(probe.as_ref()).await {
        Ok(reading) => (StatusCode::OK, Json(json!({ "reading": reading }))),
        Err(error) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": error.to_string() })),
        ),
    }
}

async fn matrix_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.snapshot().await {
        Ok(document) => (StatusCode::OK, Json(json!(document))),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": error.to_string() })),
        ),
    }
}
