// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Chain domain types.
//!
//! A chain is a strictly linear sequence of tool invocations. Tasks never
//! reorder and never run concurrently with each other; a halted chain simply
//! omits the tasks that did not run.

use crate::domain::tool::{ExecStatus, ToolId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One task in a submitted chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTask {
    pub tool_id: ToolId,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// When true, a failure of *this* task halts the remaining tasks.
    /// The default is to continue regardless of outcome.
    #[serde(default)]
    pub stop_on_error: bool,
}

/// Result of one executed chain task, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStepResult {
    pub task: ChainTask,
    pub status: ExecStatus,
    /// Truncated stdout of the tool, when it ran.
    pub output: String,
    /// Failure detail (stderr or a reason string), when there is one.
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Ordered report for a chain run. `steps.len()` never exceeds the number of
/// submitted tasks; absence of a trailing task means it did not run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    pub chain_id: Uuid,
    pub steps: Vec<ChainStepResult>,
    /// True when a `stop_on_error` task failed and truncated the run.
    pub halted: bool,
}

impl ChainReport {
    pub fn new() -> Self {
        Self {
            chain_id: Uuid::new_v4(),
            steps: Vec::new(),
            halted: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        !self.halted && self.steps.iter().all(|s| s.status == ExecStatus::Success)
    }
}

impl Default for ChainReport {
    fn default() -> Self {
        Self::new()
    }
}
