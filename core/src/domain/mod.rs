// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

pub mod chain;
pub mod matrix;
pub mod pressure;
pub mod probe;
pub mod tool;

pub use chain::{ChainReport, ChainStepResult, ChainTask};
pub use matrix::PressureMatrixDocument;
pub use pressure::{PressureReading, PressureSample, PressureTally, Trend};
pub use probe::{HealthReport, HealthStatus, Probe, ProbeError};
pub use tool::{ExecStatus, ExecutionRequest, ExecutionResult, ToolDescriptor, ToolId};
