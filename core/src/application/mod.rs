// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

pub mod chain;
pub mod execution;
pub mod health;
pub mod probe_runner;

pub use chain::ChainExecutor;
pub use execution::ExecutionEngine;
pub use health::{FleetReport, HealthAggregator, HealthQuery, ProbeHealthSummary};
pub use probe_runner::{ProbeRunError, ProbeRunner};
