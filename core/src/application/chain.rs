// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Chain executor application service.
//!
//! Runs tasks strictly in submission order, one at a time, each under the
//! same fixed ceiling timeout. The failure policy is asymmetric: the
//! default is to continue past any outcome, and only a failing task that
//! itself set `stop_on_error` halts the rest. Halted chains return the
//! results built so far; tasks that did not run are simply absent.

use crate::application::execution::ExecutionEngine;
use crate::domain::chain::{ChainReport, ChainStepResult, ChainTask};
use crate::domain::tool::{ExecStatus, ExecutionRequest};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct ChainExecutor {
    engine: Arc<ExecutionEngine>,
    /// Ceiling shared by every task in the chain; no per-task override.
    task_timeout: Duration,
}

impl ChainExecutor {
    pub fn new(engine: Arc<ExecutionEngine>, task_timeout: Duration) -> Self {
        Self {
            engine,
            task_timeout,
        }
    }

    pub async fn execute(&self, tasks: Vec<ChainTask>) -> ChainReport {
        let mut report = ChainReport::new();
        let submitted = tasks.len();
        info!(chain_id = %report.chain_id, tasks = submitted, "chain started");

        for task in tasks {
            let result = self
                .engine
                .execute(ExecutionRequest {
                    tool_id: task.tool_id.clone(),
                    payload: task.payload.clone(),
                    timeout: self.task_timeout,
                })
                .await;

            let failed = result.status.is_failure();
            let stop = failed && task.stop_on_error;
            report.steps.push(ChainStepResult {
                status: result.status,
                output: result.stdout,
                error: failure_detail(&result.status, &result.stderr),
                duration_ms: result.duration_ms,
                task,
            });

            if stop {
                warn!(
                    chain_id = %report.chain_id,
                    completed = report.steps.len(),
                    submitted,
                    "chain halted by stop_on_error task"
                );
                report.halted = true;
                break;
            }
        }

        counter!("opspulse_chain_runs_total", "halted" => report.halted.to_string()).increment(1);
        info!(
            chain_id = %report.chain_id,
            steps = report.steps.len(),
            halted = report.halted,
            "chain finished"
        );
        report
    }
}

fn failure_detail(status: &ExecStatus, stderr: &str) -> Option<String> {
    match status {
        ExecStatus::Success => None,
        ExecStatus::NotFound => Some("tool not found in catalog".to_string()),
        ExecStatus::Timeout => Some("timed out and was terminated".to_string()),
        ExecStatus::Error | ExecStatus::SpawnError => Some(if stderr.is_empty() {
            "tool failed without diagnostics".to_string()
        } else {
            stderr.to_string()
        }),
    }
}
