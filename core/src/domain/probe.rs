// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Probe seam.
//!
//! A probe polls exactly one external system. `check()` is the full metric
//! pass producing a [`PressureSample`]; `health()` is a single lightweight
//! reachability call, independent of and cheaper than `check()`.

use crate::domain::pressure::PressureSample;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Error,
    /// Quick mode only: no network call was made.
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Error => "error",
            HealthStatus::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one `health()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Short diagnostic reason, suitable for a dashboard row.
    pub message: String,
    pub latency_ms: Option<u64>,
    pub checked_at: DateTime<Utc>,
    /// Raw diagnostic detail; available but not required for consumption.
    #[serde(default)]
    pub details: serde_json::Value,
}

impl HealthReport {
    pub fn ok(message: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            status: HealthStatus::Ok,
            message: message.into(),
            latency_ms: Some(latency_ms),
            checked_at: Utc::now(),
            details: serde_json::Value::Null,
        }
    }

    pub fn degraded(message: impl Into<String>, latency_ms: Option<u64>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: message.into(),
            latency_ms,
            checked_at: Utc::now(),
            details: serde_json::Value::Null,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
            latency_ms: None,
            checked_at: Utc::now(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    /// A sub-metric fetch failed. During a full check the probes default
    /// the metric and keep going; the error surfaces unwrapped only when a
    /// fetch failure is fatal to the whole pass.
    #[error("probe '{probe}' failed to fetch '{metric}': {reason}")]
    Fetch {
        probe: String,
        metric: String,
        reason: String,
    },
}

/// One external system under observation.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Stable probe id, used for selection and reporting.
    fn id(&self) -> &str;

    /// Matrix group key (doubles as the probe's category).
    fn group(&self) -> &str;

    /// Matrix sector key within the group.
    fn sector(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Full metric pass. Partial sub-metric failures are tolerated inside
    /// the probe (logged and defaulted); missing credentials yield a
    /// conservative high-pressure sample rather than an error.
    async fn check(&self) -> Result<PressureSample, ProbeError>;

    /// One lightweight reachability/credential call.
    async fn health(&self) -> HealthReport;
}
