// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Storefront probe: e-commerce platform order flow and error rates.
//!
//! Matrix key: group `commerce`, sector `storefront`.

use super::{fetch_json, SLOW_HEALTH_MS};
use crate::domain::pressure::{PressureSample, PressureTally};
use crate::domain::probe::{HealthReport, Probe, ProbeError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;
use tracing::warn;

/// Pressure reported when the integration has no credentials at all. The
/// matrix must never understate risk for an unconfigured platform.
const MISSING_CREDENTIALS_PRESSURE: u8 = 85;

pub struct StorefrontProbe {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl StorefrontProbe {
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch one sub-metric document, defaulting to `null` on failure so
    /// the rest of the check still runs. The failure itself becomes an
    /// additive "unavailable" rule, so an unreachable platform must not score
    /// as a calm one.
    async fn metric_or_default(
        &self,
        path: &str,
        rule: &str,
        tally: &mut PressureTally,
    ) -> serde_json::Value {
        match fetch_json(
            &self.client,
            self.id(),
            rule,
            &self.url(path),
            self.api_key.as_deref(),
        )
        .await
        {
            Ok(value) => value,
            Err(error) => {
                warn!(%error, path, "sub-metric fetch failed, defaulting");
                tally.add(rule, 25);
                serde_json::Value::Null
            }
        }
    }
}

#[async_trait]
impl Probe for StorefrontProbe {
    fn id(&self) -> &str {
        "storefront"
    }

    fn group(&self) -> &str {
        "commerce"
    }

    fn sector(&self) -> &str {
        "storefront"
    }

    fn display_name(&self) -> &str {
        "Storefront"
    }

    async fn check(&self) -> Result<PressureSample, ProbeError> {
        if self.api_key.is_none() {
            warn!(probe = self.id(), "credentials missing, reporting conservative pressure");
            return Ok(PressureSample::new(
                self.display_name(),
                MISSING_CREDENTIALS_PRESSURE,
                json!({
                    "credentials_missing": true,
                    "reason": "no API key configured for the storefront platform",
                }),
            ));
        }

        let mut tally = PressureTally::new();

        let orders = self
            .metric_or_default("/admin/api/orders/summary", "order_metrics_unavailable", &mut tally)
            .await;
        let errors = self
            .metric_or_default("/admin/api/health/errors", "error_metrics_unavailable", &mut tally)
            .await;

        let pending = orders["pending"].as_u64().unwrap_or(0);
        let oldest_pending_minutes = orders["oldest_pending_minutes"].as_u64().unwrap_or(0);
        let error_rate = errors["error_rate"].as_f64().unwrap_or(0.0);
        let checkout_failures = errors["checkout_failures"].as_u64().unwrap_or(0);

        tally.add_if(pending > 50, "order_backlog", 20);
        tally.add_if(oldest_pending_minutes > 120, "stale_orders", 25);
        tally.add_if(error_rate > 0.05, "elevated_error_rate", 30);
        tally.add_if(checkout_failures > 0, "checkout_failures", 25);

        Ok(PressureSample::new(
            self.display_name(),
            tally.score(),
            json!({
                "credentials_missing": false,
                "metrics": {
                    "pending_orders": pending,
                    "oldest_pending_minutes": oldest_pending_minutes,
                    "error_rate": error_rate,
                    "checkout_failures": checkout_failures,
                },
                "rules_fired": tally.to_sensor_rules(),
            }),
        ))
    }

    async fn health(&self) -> HealthReport {
        let Some(api_key) = self.api_key.as_deref() else {
            return HealthReport::error("no API key configured");
        };

        let started = Instant::now();
        let response = self
            .client
            .get(self.url("/admin/api/ping"))
            .bearer_auth(api_key)
            .send()
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match response {
            Ok(response) if response.status().is_success() => {
                if latency_ms > SLOW_HEALTH_MS {
                    HealthReport::degraded(
                        format!("reachable but slow ({latency_ms}ms)"),
                        Some(latency_ms),
                    )
                } else {
                    HealthReport::ok("storefront reachable", latency_ms)
                }
            }
            Ok(response) if response.status().as_u16() == 401 || response.status().as_u16() == 403 => {
                HealthReport::error(format!("authentication failed (HTTP {})", response.status()))
            }
            Ok(response) => HealthReport::degraded(
                format!("unexpected HTTP {}", response.status()),
                Some(latency_ms),
            ),
            Err(error) => HealthReport::error(format!("unreachable: {error}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::probe::HealthStatus;

    fn probe_for(server: &mockito::ServerGuard) -> StorefrontProbe {
        StorefrontProbe::new(
            reqwest::Client::new(),
            server.url(),
            Some("test-key".to_string()),
        )
    }

    #[tokio::test]
    async fn calm_platform_scores_zero() {
        let mut server = mockito::Server::new_async().await;
        let _orders = server
            .mock("GET", "/admin/api/orders/summary")
            .with_body(r#"{"pending": 3, "oldest_pending_minutes": 10}"#)
            .create_async()
            .await;
        let _errors = server
            .mock("GET", "/admin/api/health/errors")
            .with_body(r#"{"error_rate": 0.001, "checkout_failures": 0}"#)
            .create_async()
            .await;

        let sample = probe_for(&server).check().await.unwrap();
        assert_eq!(sample.pressure, 0);
        assert_eq!(sample.sensor_data["credentials_missing"], false);
    }

    #[tokio::test]
    async fn violated_rules_sum_and_clamp() {
        let mut server = mockito::Server::new_async().await;
        let _orders = server
            .mock("GET", "/admin/api/orders/summary")
            .with_body(r#"{"pending": 500, "oldest_pending_minutes": 600}"#)
            .create_async()
            .await;
        let _errors = server
            .mock("GET", "/admin/api/health/errors")
            .with_body(r#"{"error_rate": 0.2, "checkout_failures": 12}"#)
            .create_async()
            .await;

        let sample = probe_for(&server).check().await.unwrap();
        // 20 + 25 + 30 + 25 = 100, and it must never exceed that.
        assert_eq!(sample.pressure, 100);
        assert_eq!(
            sample.sensor_data["rules_fired"].as_array().unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn failed_sub_metric_defaults_and_raises_pressure() {
        let mut server = mockito::Server::new_async().await;
        let _orders = server
            .mock("GET", "/admin/api/orders/summary")
            .with_status(500)
            .create_async()
            .await;
        let _errors = server
            .mock("GET", "/admin/api/health/errors")
            .with_body(r#"{"error_rate": 0.0, "checkout_failures": 0}"#)
            .create_async()
            .await;

        let sample = probe_for(&server).check().await.unwrap();
        assert_eq!(sample.pressure, 25);
        assert_eq!(sample.sensor_data["metrics"]["pending_orders"], 0);
    }

    #[tokio::test]
    async fn missing_credentials_reports_conservative_pressure() {
        let probe = StorefrontProbe::new(
            reqwest::Client::new(),
            "http://localhost:1".to_string(),
            None,
        );
        let sample = probe.check().await.unwrap();
        assert!(sample.pressure >= 80);
        assert_eq!(sample.sensor_data["credentials_missing"], true);
    }

    #[tokio::test]
    async fn health_reports_ok_when_ping_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let _ping = server
            .mock("GET", "/admin/api/ping")
            .with_body("pong")
            .create_async()
            .await;

        let report = probe_for(&server).health().await;
        assert_eq!(report.status, HealthStatus::Ok);
        assert!(report.latency_ms.is_some());
    }

    #[tokio::test]
    async fn health_flags_authentication_failures() {
        let mut server = mockito::Server::new_async().await;
        let _ping = server
            .mock("GET", "/admin/api/ping")
            .with_status(401)
            .create_async()
            .await;

        let report = probe_for(&server).health().await;
        assert_eq!(report.status, HealthStatus::Error);
        assert!(report.message.contains("authentication"));
    }

    #[tokio::test]
    async fn health_is_error_when_unreachable() {
        let probe = StorefrontProbe::new(
            reqwest::Client::new(),
            // Reserved port with nothing listening.
            "http://127.0.0.1:1".to_string(),
            Some("test-key".to_string()),
        );
        let report = probe.health().await;
        assert_eq!(report.status, HealthStatus::Error);
    }
}
