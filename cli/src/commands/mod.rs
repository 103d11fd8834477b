// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! CLI command implementations

pub mod chain;
pub mod matrix;
pub mod probes;
pub mod serve;
pub mod tools;

pub use chain::ChainCommand;
pub use matrix::MatrixCommand;
pub use probes::ProbesCommand;
pub use tools::ToolsCommand;
