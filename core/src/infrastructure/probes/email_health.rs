// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Email platform probe: delivery quality and queue depth.
//!
//! Matrix key: group `marketing`, sector `email_health`.

use super::{fetch_json, SLOW_HEALTH_MS};
use crate::domain::pressure::{PressureSample, PressureTally};
use crate::domain::probe::{HealthReport, Probe, ProbeError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Instant;
use tracing::warn;

const MISSING_CREDENTIALS_PRESSURE: u8 = 85;

pub struct EmailHealthProbe {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl EmailHealthProbe {
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
impl Probe for EmailHealthProbe {
    fn id(&self) -> &str {
        "email_health"
    }

    fn group(&self) -> &str {
        "marketing"
    }

    fn sector(&self) -> &str {
        "email_health"
    }

    fn display_name(&self) -> &str {
        "Email Health"
    }

    async fn check(&self) -> Result<PressureSample, ProbeError> {
        if self.api_key.is_none() {
            warn!(probe = self.id(), "credentials missing, reporting conservative pressure");
            return Ok(PressureSample::new(
                self.display_name(),
                MISSING_CREDENTIALS_PRESSURE,
                json!({
                    "credentials_missing": true,
                    "reason": "no API key configured for the email platform",
                }),
            ));
        }

        let mut tally = PressureTally::new();

        let delivery = self
            .metric_or_default("/v1/stats/delivery", "delivery_metrics_unavailable", &mut tally)
            .await;
        let queue = self
            .metric_or_default("/v1/queue", "queue_metrics_unavailable", &mut tally)
            .await;

        // A missing delivered_rate must not read as 0% delivered; default
        // to a healthy rate and let the "unavailable" rule carry the risk.
        let delivered_rate = delivery["delivered_rate"].as_f64().unwrap_or(100.0);
        let bounce_rate = delivery["bounce_rate"].as_f64().unwrap_or(0.0);
        let spam_rate = delivery["spam_rate"].as_f64().unwrap_or(0.0);
        let backlog = queue["backlog"].as_u64().unwrap_or(0);

        tally.add_if(bounce_rate > 2.0, "high_bounce_rate", 25);
        tally.add_if(spam_rate > 0.1, "spam_complaints", 30);
        tally.add_if(delivered_rate < 95.0, "low_delivery_rate", 25);
        tally.add_if(backlog > 500, "queue_backlog", 20);

        Ok(PressureSample::new(
            self.display_name(),
            tally.score(),
            json!({
                "credentials_missing": false,
                "metrics": {
                    "delivered_rate": delivered_rate,
                    "bounce_rate": bounce_rate,
                    "spam_rate": spam_rate,
                    "queue_backlog": backlog,
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
            .get(self.url("/v1/ping"))
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
                    HealthReport::ok("email platform reachable", latency_ms)
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

    fn probe_for(server: &mockito::ServerGuard) -> EmailHealthProbe {
        EmailHealthProbe::new(
            reqwest::Client::new(),
            server.url(),
            Some("test-key".to_string()),
        )
    }

    #[tokio::test]
    async fn healthy_delivery_scores_zero() {
        let mut server = mockito::Server::new_async().await;
        let _delivery = server
            .mock("GET", "/v1/stats/delivery")
            .with_body(r#"{"delivered_rate": 99.2, "bounce_rate": 0.4, "spam_rate": 0.01}"#)
            .create_async()
            .await;
        let _queue = server
            .mock("GET", "/v1/queue")
            .with_body(r#"{"backlog": 12}"#)
            .create_async()
            .await;

        let sample = probe_for(&server).check().await.unwrap();
        assert_eq!(sample.pressure, 0);
    }

    #[tokio::test]
    async fn degraded_delivery_fires_rules() {
        let mut server = mockito::Server::new_async().await;
        let _delivery = server
            .mock("GET", "/v1/stats/delivery")
            .with_body(r#"{"delivered_rate": 91.0, "bounce_rate": 4.5, "spam_rate": 0.02}"#)
            .create_async()
            .await;
        let _queue = server
            .mock("GET", "/v1/queue")
            .with_body(r#"{"backlog": 900}"#)
            .create_async()
            .await;

        let sample = probe_for(&server).check().await.unwrap();
        // high_bounce_rate (25) + low_delivery_rate (25) + queue_backlog (20)
        assert_eq!(sample.pressure, 70);
    }

    #[tokio::test]
    async fn unreachable_metrics_do_not_score_calm() {
        let probe = EmailHealthProbe::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1".to_string(),
            Some("test-key".to_string()),
        );
        let sample = probe.check().await.unwrap();
        // Both sub-metric "unavailable" rules fire.
        assert_eq!(sample.pressure, 50);
    }

    #[tokio::test]
    async fn missing_credentials_reports_conservative_pressure() {
        let probe = EmailHealthProbe::new(
            reqwest::Client::new(),
            "http://localhost:1".to_string(),
            None,
        );
        let sample = probe.check().await.unwrap();
        assert!(sample.pressure >= 80);
        assert_eq!(sample.sensor_data["credentials_missing"], true);

        let report = probe.health().await;
        assert_eq!(report.status, HealthStatus::Error);
    }

    #[tokio::test]
    async fn health_degrades_on_unexpected_status() {
        let mut server = mockito::Server::new_async().await;
        let _ping = server
            .mock("GET", "/v1/ping")
            .with_status(503)
            .create_async()
            .await;

        let report = probe_for(&server).health().await;
        assert_eq!(report.status, HealthStatus::Degraded);
    }
}
