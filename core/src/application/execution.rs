// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Execution engine application service.
//!
//! Resolves a tool id against the catalog and delegates to the runtime
//! seam. Every failure mode becomes a structured [`ExecutionResult`]; this
//! surface never throws into the orchestrator's control flow, and it never
//! retries (retry policy belongs to the caller, see
//! [`ExecStatus::is_retryable`]).

use crate::domain::tool::{
    ExecStatus, ExecutionRequest, ExecutionResult, ToolDescriptor,
};
use crate::infrastructure::runtime::{RunStatus, ToolRuntime};
use chrono::Utc;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::infrastructure::catalog::ToolCatalog;

pub struct ExecutionEngine {
    catalog: Arc<ToolCatalog>,
    runtime: Arc<dyn ToolRuntime>,
}

impl ExecutionEngine {
    pub fn new(catalog: Arc<ToolCatalog>, runtime: Arc<dyn ToolRuntime>) -> Self {
        Self { catalog, runtime }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Run one tool by id. A registry miss is a `NotFound` result, not an
    /// error.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let Some(descriptor) = self.catalog.lookup(&request.tool_id) else {
            warn!(tool = %request.tool_id, "tool not found in catalog");
            counter!("opspulse_tool_executions_total", "status" => "not_found").increment(1);
            return ExecutionResult::not_found(request.tool_id);
        };
        self.execute_descriptor(descriptor, &request.payload, request.timeout)
            .await
    }

    /// Run an already-resolved descriptor.
    pub async fn execute_descriptor(
        &self,
        descriptor: &ToolDescriptor,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> ExecutionResult {
        let invocation_id = Uuid::new_v4();
        info!(
            tool = %descriptor.id,
            %invocation_id,
            timeout_ms = timeout.as_millis() as u64,
            "executing tool"
        );

        let outcome = self.runtime.run(descriptor, payload, timeout).await;

        let status = match &outcome.status {
            RunStatus::Completed { exit_code: 0 } => ExecStatus::Success,
            RunStatus::Completed { .. } => ExecStatus::Error,
            RunStatus::TimedOut => ExecStatus::Timeout,
            RunStatus::SpawnFailed { .. } => ExecStatus::SpawnError,
        };

        // Spawn failures carry their reason in stderr so callers always find
        // failure detail in the same place.
        let stderr = match &outcome.status {
            RunStatus::SpawnFailed { reason } if outcome.stderr.is_empty() => reason.clone(),
            _ => outcome.stderr,
        };

        let duration_ms = outcome.duration.as_millis() as u64;
        counter!("opspulse_tool_executions_total", "status" => status.to_string()).increment(1);
        histogram!("opspulse_tool_execution_duration_seconds")
            .record(outcome.duration.as_secs_f64());

        info!(
            tool = %descriptor.id,
            %invocation_id,
            %status,
            duration_ms,
            "tool execution finished"
        );

        ExecutionResult {
            invocation_id,
            tool_id: descriptor.id.clone(),
            status,
            stdout: outcome.stdout,
            stderr,
            duration_ms,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::infrastructure::runtime::RunOutcome;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Runtime returning canned outcomes per tool id; unknown ids succeed.
    pub struct MockRuntime {
        outcomes: HashMap<String, RunStatus>,
    }

    impl MockRuntime {
        pub fn new() -> Self {
            Self {
                outcomes: HashMap::new(),
            }
        }

        pub fn with_outcome(mut self, tool_id: &str, status: RunStatus) -> Self {
            self.outcomes.insert(tool_id.to_string(), status);
            self
        }
    }

    #[async_trait]
    impl ToolRuntime for MockRuntime {
        async fn run(
            &self,
            descriptor: &ToolDescriptor,
            _payload: &serde_json::Value,
            _timeout: Duration,
        ) -> RunOutcome {
            let status = self
                .outcomes
                .get(descriptor.id.as_str())
                .cloned()
                .unwrap_or(RunStatus::Completed { exit_code: 0 });
            let stderr = match &status {
                RunStatus::Completed { exit_code } if *exit_code != 0 => {
                    format!("{} failed", descriptor.id)
                }
                _ => String::new(),
            };
            RunOutcome {
                status,
                stdout: format!("{} ran", descriptor.id),
                stderr,
                duration: Duration::from_millis(5),
            }
        }
    }

    pub fn descriptor(id: &str) -> ToolDescriptor {
        use crate::domain::tool::ToolId;
        ToolDescriptor {
            id: ToolId::new(id),
            display_name: id.to_string(),
            description: String::new(),
            executable: std::path::PathBuf::from(format!("/opt/tools/{id}")),
            category: "test".to_string(),
        }
    }
}
