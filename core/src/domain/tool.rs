// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Tool catalog domain types.
//!
//! A *tool* is a single automation unit invoked as an external executable.
//! Descriptors are loaded once at startup and are immutable for the process
//! lifetime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Identifier for a tool in the catalog.
///
/// Lookup is separator-insensitive: `email-sensor`, `email_sensor` and
/// `Email Sensor` all resolve to the same catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolId(pub String);

impl ToolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form used as the catalog key.
    pub fn normalized(&self) -> String {
        self.0
            .trim()
            .to_ascii_lowercase()
            .replace(['-', ' '], "_")
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ToolId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One invocable automation unit in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub executable: PathBuf,
    pub category: String,
}

impl ToolDescriptor {
    /// Validate a descriptor parsed from the catalog.
    ///
    /// Individual malformed entries are rejected without failing the rest of
    /// the catalog load.
    pub fn validate(&self) -> Result<(), ToolValidationError> {
        if self.id.0.trim().is_empty() {
            return Err(ToolValidationError::EmptyId);
        }
        if self.executable.as_os_str().is_empty() {
            return Err(ToolValidationError::EmptyExecutable {
                id: self.id.to_string(),
            });
        }
        if self.display_name.trim().is_empty() {
            return Err(ToolValidationError::EmptyDisplayName {
                id: self.id.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ToolValidationError {
    #[error("tool entry has an empty id")]
    EmptyId,
    #[error("tool '{id}' has an empty executable path")]
    EmptyExecutable { id: String },
    #[error("tool '{id}' has an empty display name")]
    EmptyDisplayName { id: String },
}

/// Request to run a single tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub tool_id: ToolId,
    /// Opaque payload, serialized to JSON and passed as the tool's single
    /// positional argument.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Wall-clock budget for the subprocess.
    #[serde(with = "duration_ms", rename = "timeout_ms")]
    pub timeout: Duration,
}

/// Terminal status of a single tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    /// Process exited 0.
    Success,
    /// Process ran and exited non-zero.
    Error,
    /// Process never started (missing binary, permission denied).
    SpawnError,
    /// Process was forcibly terminated at the timeout.
    Timeout,
    /// No catalog entry for the requested id.
    NotFound,
}

impl ExecStatus {
    /// Whether a caller-side retry could plausibly change the outcome.
    ///
    /// The engine itself never retries; retry policy belongs to the caller.
    pub fn is_retryable(self) -> bool {
        matches!(self, ExecStatus::Error | ExecStatus::Timeout)
    }

    pub fn is_failure(self) -> bool {
        !matches!(self, ExecStatus::Success)
    }
}

impl std::fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecStatus::Success => "success",
            ExecStatus::Error => "error",
            ExecStatus::SpawnError => "spawn_error",
            ExecStatus::Timeout => "timeout",
            ExecStatus::NotFound => "not_found",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one tool invocation, returned to the caller and never
/// persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub invocation_id: Uuid,
    pub tool_id: ToolId,
    pub status: ExecStatus,
    /// Captured stdout, truncated to the configured cap.
    pub stdout: String,
    /// Captured stderr, truncated to the configured cap.
    pub stderr: String,
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn not_found(tool_id: ToolId) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            tool_id,
            status: ExecStatus::NotFound,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
            finished_at: Utc::now(),
        }
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_id_normalization_is_separator_insensitive() {
        assert_eq!(ToolId::new("Email-Sensor").normalized(), "email_sensor");
        assert_eq!(ToolId::new("email_sensor").normalized(), "email_sensor");
        assert_eq!(ToolId::new("  Email Sensor ").normalized(), "email_sensor");
    }

    #[test]
    fn descriptor_validation_rejects_empty_fields() {
        let descriptor = ToolDescriptor {
            id: ToolId::new(""),
            display_name: "X".to_string(),
            description: String::new(),
            executable: PathBuf::from("/usr/bin/true"),
            category: "ops".to_string(),
        };
        assert!(matches!(
            descriptor.validate(),
            Err(ToolValidationError::EmptyId)
        ));

        let descriptor = ToolDescriptor {
            id: ToolId::new("x"),
            display_name: "X".to_string(),
            description: String::new(),
            executable: PathBuf::new(),
            category: "ops".to_string(),
        };
        assert!(matches!(
            descriptor.validate(),
            Err(ToolValidationError::EmptyExecutable { .. })
        ));
    }

    #[test]
    fn status_retry_classification() {
        assert!(ExecStatus::Error.is_retryable());
        assert!(ExecStatus::Timeout.is_retryable());
        assert!(!ExecStatus::SpawnError.is_retryable());
        assert!(!ExecStatus::NotFound.is_retryable());
        assert!(!ExecStatus::Success.is_retryable());
    }

    #[test]
    fn execution_request_round_trips_timeout_millis() {
        let json = r#"{"tool_id":"store_sensor","payload":{},"timeout_ms":2500}"#;
        let request: ExecutionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.timeout, Duration::from_millis(2500));
    }
}
