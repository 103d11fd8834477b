// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Opspulse core: automation orchestration and health-signal aggregation.
//!
//! The engine catalogs executable automation units ("tools"), runs them as
//! isolated, time-bounded subprocesses, composes linear chains with
//! per-task failure policy, and aggregates probe results from independent
//! external systems into one shared pressure matrix.
//!
//! # Architecture
//!
//! - **domain**: data model and seams (tool, chain, pressure, probe)
//! - **application**: orchestration services (execution, chains, health)
//! - **infrastructure**: catalog loading, subprocess runtime, matrix
//!   store, probe adapters
//! - **presentation**: HTTP surface for the dashboard collaborator

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use config::EngineConfig;
pub use domain::*;
