// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Probe implementations and the probe registry.
//!
//! Each probe is an anti-corruption adapter for one external platform. The
//! business meaning of the metrics lives here; the scoring mechanics
//! (additive tally, clamping, trend) live in the domain layer.

pub mod email_health;
pub mod storefront;

pub use email_health::EmailHealthProbe;
pub use storefront::StorefrontProbe;

use crate::config::ProbesConfig;
use crate::domain::probe::{Probe, ProbeError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// A `health()` round-trip slower than this is reachable but degraded.
pub(crate) const SLOW_HEALTH_MS: u64 = 2_000;

/// Fetch one JSON sub-metric document. On failure the error names the
/// probe and metric; callers log it, substitute a default and keep going.
pub(crate) async fn fetch_json(
    client: &reqwest::Client,
    probe: &str,
    metric: &str,
    url: &str,
    api_key: Option<&str>,
) -> Result<serde_json::Value, ProbeError> {
    let fetch_err = |reason: String| ProbeError::Fetch {
        probe: probe.to_string(),
        metric: metric.to_string(),
        reason,
    };

    let mut request = client.get(url);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    let response = request.send().await.map_err(|e| fetch_err(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }
    response.json().await.map_err(|e| fetch_err(e.to_string()))
}

/// Immutable registry of probes, keyed by id.
#[derive(Default)]
pub struct ProbeRegistry {
    probes: BTreeMap<String, Arc<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration; unconfigured probes are
    /// simply absent.
    pub fn from_config(config: &ProbesConfig) -> Self {
        let client = reqwest::Client::new();
        let mut registry = Self::new();
        if let Some(storefront) = &config.storefront {
            registry.register(Arc::new(StorefrontProbe::new(
                client.clone(),
                storefront.base_url.clone(),
                storefront.api_key(),
            )));
        }
        if let Some(email) = &config.email {
            registry.register(Arc::new(EmailHealthProbe::new(
                client.clone(),
                email.base_url.clone(),
                email.api_key(),
            )));
        }
        info!(probes = registry.len(), "probe registry built");
        registry
    }

    pub fn register(&mut self, probe: Arc<dyn Probe>) {
        self.probes.insert(probe.id().to_string(), probe);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Probe>> {
        self.probes.get(id).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn Probe>> {
        self.probes.values().cloned().collect()
    }

    pub fn in_group(&self, group: &str) -> Vec<Arc<dyn Probe>> {
        self.probes
            .values()
            .filter(|p| p.group() == group)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}
