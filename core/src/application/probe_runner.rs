// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Runs one probe's full `check()` pass and writes the result through the
//! matrix store. Scheduling lives outside the engine; this is the unit of
//! work a scheduler invokes.

use crate::domain::pressure::PressureReading;
use crate::domain::probe::{Probe, ProbeError};
use crate::infrastructure::matrix_store::{MatrixStore, StoreError};
use metrics::{counter, histogram};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ProbeRunError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ProbeRunner {
    store: MatrixStore,
}

impl ProbeRunner {
    pub fn new(store: MatrixStore) -> Self {
        Self { store }
    }

    pub async fn run_check(&self, probe: &dyn Probe) -> Result<PressureReading, ProbeRunError> {
        let started = Instant::now();
        let sample = probe.check().await?;
        let reading = self
            .store
            .update(probe.group(), probe.sector(), sample)
            .await?;

        counter!("opspulse_probe_checks_total", "probe" => probe.id().to_string()).increment(1);
        histogram!("opspulse_probe_check_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            probe = probe.id(),
            group = probe.group(),
            sector = probe.sector(),
            pressure = reading.pressure,
            trend = ?reading.trend,
            "probe check recorded"
        );
        Ok(reading)
    }
}
