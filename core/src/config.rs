// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Engine configuration.
//!
//! Loaded from a YAML file when one exists, otherwise built from defaults.
//! Credentials are never stored in the file; the config names the
//! environment variable to read them from.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tool catalog file (YAML).
    pub catalog_path: PathBuf,
    /// Pressure matrix document (JSON).
    pub matrix_path: PathBuf,
    /// Per-stream stdout/stderr capture cap, in bytes.
    pub capture_limit_bytes: usize,
    /// Default per-tool timeout for direct invocations.
    pub default_tool_timeout_ms: u64,
    /// Fixed ceiling timeout shared by every task in a chain.
    pub chain_task_timeout_ms: u64,
    /// Trend comparison threshold (strict |delta| > threshold).
    pub trend_threshold: u8,
    /// Probes surveyed concurrently by the batch health aggregator.
    pub health_batch_size: usize,
    /// Per-probe budget for one `health()` call.
    pub health_timeout_ms: u64,
    pub probes: ProbesConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("tools.yaml"),
            matrix_path: PathBuf::from("pressure_matrix.json"),
            capture_limit_bytes: 64 * 1024,
            default_tool_timeout_ms: 120_000,
            chain_task_timeout_ms: 120_000,
            trend_threshold: 5,
            health_batch_size: 5,
            health_timeout_ms: 10_000,
            probes: ProbesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    pub storefront: Option<HttpProbeConfig>,
    pub email: Option<HttpProbeConfig>,
}

/// Settings for one HTTP-backed probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProbeConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key. Absent
    /// variable (or absent setting) means "credentials missing"; probes
    /// still report, at a conservative high pressure.
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl HttpProbeConfig {
    /// Resolve the credential from the environment, if configured and set.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|v| !v.is_empty())
    }
}

impl EngineConfig {
    /// Load from `path`. A missing file yields defaults; an unreadable or
    /// malformed file is an explicit startup error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn default_tool_timeout(&self) -> Duration {
        Duration::from_millis(self.default_tool_timeout_ms)
    }

    pub fn chain_task_timeout(&self) -> Duration {
        Duration::from_millis(self.chain_task_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
