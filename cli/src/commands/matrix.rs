// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Pressure matrix commands
//!
//! - `opspulse matrix show` - Print the current pressure matrix

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;

use crate::engine;

#[derive(Subcommand)]
pub enum MatrixCommand {
    /// Print the current pressure matrix
    Show {
        /// Emit the raw document as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: MatrixCommand, config_path: &Path) -> Result<()> {
    match command {
        MatrixCommand::Show { json } => show_matrix(config_path, json).await,
    }
}

async fn show_matrix(config_path: &Path, json: bool) -> Result<()> {
    let services = engine::bootstrap(config_path)?;
    let document = services
        .state
        .store
        .snapshot()
        .await
        .context("Matrix store is unavailable")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if document.sectors.is_empty() {
        println!("{}", "Pressure matrix is empty.".yellow());
        return Ok(());
    }

    for (group, sectors) in &document.sectors {
        println!("{}", group.bold());
        for (sector, reading) in sectors {
            let pressure = reading.pressure.to_string();
            let colored_pressure = if reading.pressure >= 70 {
                pressure.red().bold()
            } else if reading.pressure >= 40 {
                pressure.yellow()
            } else {
                pressure.green()
            };
            println!(
                "  {:<24} {:<4} {:<8} {}",
                sector,
                colored_pressure,
                reading.trend,
                reading.last_check.to_rfc3339().dimmed()
            );
        }
    }
    println!(
        "Last updated: {}",
        document.last_updated.to_rfc3339().dimmed()
    );
    Ok(())
}
