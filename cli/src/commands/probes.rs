// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Health probe commands
//!
//! - `opspulse probes list` - List registered probes
//! - `opspulse probes check <id>` - Run one probe and store its reading
//! - `opspulse probes health` - Survey probe health across the fleet

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use crate::engine;
use opspulse_core::application::health::HealthQuery;
use opspulse_core::application::probe_runner::ProbeRunner;
use opspulse_core::domain::probe::HealthStatus;

#[derive(Subcommand)]
pub enum ProbesCommand {
    /// List registered probes
    List,

    /// Run one probe's pressure check and persist the reading
    Check {
        /// Probe identifier
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Survey probe health
    Health {
        /// Filter by category
        #[arg(long, value_name = "CATEGORY")]
        category: Option<String>,

        /// Filter by probe id
        #[arg(long, value_name = "ID")]
        id: Option<String>,

        /// Skip live checks and report configuration only
        #[arg(long)]
        quick: bool,
    },
}

pub async fn handle_command(command: ProbesCommand, config_path: &Path) -> Result<()> {
    match command {
        ProbesCommand::List => list_probes(config_path),
        ProbesCommand::Check { id } => check_probe(config_path, id).await,
        ProbesCommand::Health {
            category,
            id,
            quick,
        } => probe_health(config_path, category, id, quick).await,
    }
}

fn list_probes(config_path: &Path) -> Result<()> {
    let services = engine::bootstrap(config_path)?;
    let probes = services.state.probes.all();

    if probes.is_empty() {
        println!("{}", "No probes configured.".yellow());
        return Ok(());
    }
    for probe in probes {
        println!(
            "{:<20} {:<24} {}",
            probe.id().bold(),
            format!("{}/{}", probe.group(), probe.sector()).dimmed(),
            probe.display_name()
        );
    }
    Ok(())
}

async fn check_probe(config_path: &Path, id: String) -> Result<()> {
    let services = engine::bootstrap(config_path)?;
    let Some(probe) = services.state.probes.get(&id) else {
        bail!("Unknown probe: {id}");
    };

    let runner = ProbeRunner::new(services.state.store.clone());
    let reading = runner.run_check(probe.as_ref()).await?;

    println!(
        "{} pressure {} trend {}",
        reading.label.bold(),
        reading.pressure.to_string().bold(),
        reading.trend
    );
    println!("{}", serde_json::to_string_pretty(&reading.sensor_data)?);
    Ok(())
}

async fn probe_health(
    config_path: &Path,
    category: Option<String>,
    id: Option<String>,
    quick: bool,
) -> Result<()> {
    let services = engine::bootstrap(config_path)?;
    let report = services
        .state
        .aggregator
        .query(&HealthQuery {
            category,
            id,
            quick,
        })
        .await;

    for probe in &report.probes {
        let status = match probe.status {
            HealthStatus::Ok => probe.status.to_string().green(),
            HealthStatus::Degraded => probe.status.to_string().yellow(),
            HealthStatus::Error => probe.status.to_string().red(),
            HealthStatus::Unknown => probe.status.to_string().dimmed(),
        };
        let latency = probe
            .latency_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_default();
        println!(
            "{:<20} {:<10} {:<8} {}",
            probe.id.bold(),
            status,
            latency,
            probe.message
        );
    }
    println!(
        "{} ok, {} degraded, {} error, {} unknown",
        report.counts.ok, report.counts.degraded, report.counts.error, report.counts.unknown
    );

    if report.counts.error > 0 {
        std::process::exit(1);
    }
    Ok(())
}
