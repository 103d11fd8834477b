// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

pub mod catalog;
pub mod matrix_store;
pub mod probes;
pub mod runtime;

pub use catalog::{CatalogError, ToolCatalog};
pub use matrix_store::{MatrixStore, StoreError};
pub use probes::ProbeRegistry;
pub use runtime::{ProcessRuntime, RunOutcome, RunStatus, ToolRuntime};
