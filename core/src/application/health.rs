// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Batch health aggregator.
//!
//! Answers "what is the fleet's current health" by running each selected
//! probe's lightweight `health()` with bounded concurrency and a per-probe
//! timeout: one hanging probe cannot stall the batch past its own budget,
//! and a full `check()` pass is never paid for this.

use crate::domain::probe::{HealthReport, HealthStatus, Probe};
use crate::infrastructure::probes::ProbeRegistry;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// One row of the fleet report, shaped for the dashboard collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeHealthSummary {
    pub id: String,
    pub name: String,
    pub category: String,
    pub status: HealthStatus,
    pub message: String,
    pub last_check: Option<DateTime<Utc>>,
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HealthCounts {
    pub ok: usize,
    pub degraded: usize,
    pub error: usize,
    pub unknown: usize,
}

impl HealthCounts {
    fn bump(&mut self, status: HealthStatus) {
        match status {
            HealthStatus::Ok => self.ok += 1,
            HealthStatus::Degraded => self.degraded += 1,
            HealthStatus::Error => self.error += 1,
            HealthStatus::Unknown => self.unknown += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetReport {
    pub probes: Vec<ProbeHealthSummary>,
    pub counts: HealthCounts,
}

/// Health query filters, per the dashboard interface: optional category and
/// id narrowing, plus a quick flag that skips all network calls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthQuery {
    pub category: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub quick: bool,
}

pub struct HealthAggregator {
    registry: Arc<ProbeRegistry>,
    batch_size: usize,
    probe_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(registry: Arc<ProbeRegistry>, batch_size: usize, probe_timeout: Duration) -> Self {
        Self {
            registry,
            // A zero batch would stall the stream forever.
            batch_size: batch_size.max(1),
            probe_timeout,
        }
    }

    /// Resolve a query against the registry: filter, then either a static
    /// quick listing or a live survey.
    pub async fn query(&self, query: &HealthQuery) -> FleetReport {
        let selected: Vec<Arc<dyn Probe>> = self
            .registry
            .all()
            .into_iter()
            .filter(|p| query.category.as_deref().is_none_or(|c| p.group() == c))
            .filter(|p| query.id.as_deref().is_none_or(|id| p.id() == id))
            .collect();

        if query.quick {
            return Self::quick_listing(selected);
        }
        self.survey(selected).await
    }

    /// Static catalog view: no network calls, every probe `unknown`.
    fn quick_listing(probes: Vec<Arc<dyn Probe>>) -> FleetReport {
        let mut counts = HealthCounts::default();
        let probes = probes
            .into_iter()
            .map(|p| {
                counts.bump(HealthStatus::Unknown);
                ProbeHealthSummary {
                    id: p.id().to_string(),
                    name: p.display_name().to_string(),
                    category: p.group().to_string(),
                    status: HealthStatus::Unknown,
                    message: "quick mode: no live check performed".to_string(),
                    last_check: None,
                    latency_ms: None,
                    details: serde_json::Value::Null,
                }
            })
            .collect();
        FleetReport { probes, counts }
    }

    /// Live survey with bounded concurrency: one spawned task per probe,
    /// gated by a semaphore sized to the batch.
    pub async fn survey(&self, probes: Vec<Arc<dyn Probe>>) -> FleetReport {
        let total = probes.len();
        let timeout = self.probe_timeout;
        let gate = Arc::new(Semaphore::new(self.batch_size));

        let mut tasks = Vec::with_capacity(total);
        for probe in probes {
            let gate = gate.clone();
            tasks.push(tokio::spawn(async move {
                // The semaphore is never closed, so acquisition cannot fail.
                let _permit = gate.acquire_owned().await.ok();
                survey_probe(probe, timeout).await
            }));
        }

        let mut summaries = Vec::with_capacity(total);
        for task in tasks {
            match task.await {
                Ok(summary) => summaries.push(summary),
                Err(error) => warn!(%error, "health survey task failed"),
            }
        }

        // Tasks finish in arbitrary order; report in a stable one.
        summaries.sort_by(|a, b| a.id.cmp(&b.id));

        let mut counts = HealthCounts::default();
        for summary in &summaries {
            counts.bump(summary.status);
            counter!("opspulse_probe_health_total", "status" => summary.status.to_string())
                .increment(1);
        }

        info!(
            surveyed = total,
            ok = counts.ok,
            degraded = counts.degraded,
            error = counts.error,
            "fleet health survey complete"
        );
        FleetReport {
            probes: summaries,
            counts,
        }
    }
}

async fn survey_probe(probe: Arc<dyn Probe>, timeout: Duration) -> ProbeHealthSummary {
    let report = match tokio::time::timeout(timeout, probe.health()).await {
        Ok(report) => report,
        Err(_) => {
            warn!(probe = probe.id(), timeout_ms = timeout.as_millis() as u64,
                  "health check timed out");
            HealthReport::error(format!(
                "health check timed out after {}ms",
                timeout.as_millis()
            ))
        }
    };
    ProbeHealthSummary {
        id: probe.id().to_string(),
        name: probe.display_name().to_string(),
        category: probe.group().to_string(),
        status: report.status,
        message: report.message,
        last_check: Some(report.checked_at),
        latency_ms: report.latency_ms,
        details: report.details,
    }
}
