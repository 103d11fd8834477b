// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Task chain commands
//!
//! - `opspulse chain run <file>` - Execute a chain described in a YAML or
//!   JSON file: a list of `{tool_id, payload, stop_on_error}` entries.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::engine;
use opspulse_core::domain::chain::ChainTask;
use opspulse_core::domain::tool::ExecStatus;

#[derive(Subcommand)]
pub enum ChainCommand {
    /// Execute a task chain from a file
    Run {
        /// Path to the chain file (YAML or JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub async fn handle_command(command: ChainCommand, config_path: &Path) -> Result<()> {
    match command {
        ChainCommand::Run { file } => run_chain(config_path, file).await,
    }
}

fn parse_tasks(file: &Path) -> Result<Vec<ChainTask>> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read chain file {}", file.display()))?;
    // JSON is valid YAML, one parser covers both formats
    serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse chain file {}", file.display()))
}

async fn run_chain(config_path: &Path, file: PathBuf) -> Result<()> {
    let tasks = parse_tasks(&file)?;
    if tasks.is_empty() {
        println!("{}", "Chain file contains no tasks.".yellow());
        return Ok(());
    }
    let total = tasks.len();

    let services = engine::bootstrap(config_path)?;
    let report = services.state.chains.execute(tasks).await;

    println!("Chain {}", report.chain_id.to_string().dimmed());
    for (index, step) in report.steps.iter().enumerate() {
        let label = format!(
            "[{}/{}] {:<24} {} ({} ms)",
            index + 1,
            total,
            step.task.tool_id.as_str(),
            step.status,
            step.duration_ms
        );
        match step.status {
            ExecStatus::Success => println!("{}", label.green()),
            _ => println!("{}", label.red()),
        }
        if let Some(error) = &step.error {
            println!("    {}", error.red().dimmed());
        }
    }

    if report.halted {
        let skipped = total - report.steps.len();
        println!(
            "{}",
            format!("Chain halted; {} task(s) did not run.", skipped).yellow().bold()
        );
        std::process::exit(1);
    }
    if report.succeeded() {
        println!("{}", "Chain completed.".green().bold());
        Ok(())
    } else {
        println!("{}", "Chain completed with failures.".yellow().bold());
        std::process::exit(1);
    }
}
