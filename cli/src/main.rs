// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! # Opspulse CLI
//!
//! The `opspulse` binary drives the automation and health-signal engine.
//!
//! ## Commands
//!
//! - `opspulse serve` - Run the HTTP API server
//! - `opspulse tools list|run` - Inspect and invoke registered tools
//! - `opspulse chain run <file>` - Execute a task chain from a YAML/JSON file
//! - `opspulse probes list|check|health` - Health probe operations
//! - `opspulse matrix show` - Print the current pressure matrix

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod engine;

use commands::{ChainCommand, MatrixCommand, ProbesCommand, ToolsCommand};

/// Opspulse - automation orchestration and health-signal aggregation
#[derive(Parser)]
#[command(name = "opspulse")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "OPSPULSE_CONFIG_PATH",
        default_value = "opspulse.yaml",
        value_name = "FILE"
    )]
    config: PathBuf,

    /// HTTP API host (serve mode)
    #[arg(long, global = true, env = "OPSPULSE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// HTTP API port (serve mode)
    #[arg(long, global = true, env = "OPSPULSE_PORT", default_value = "8600")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "OPSPULSE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Tool catalog operations
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },

    /// Task chain operations
    Chain {
        #[command(subcommand)]
        command: ChainCommand,
    },

    /// Health probe operations
    Probes {
        #[command(subcommand)]
        command: ProbesCommand,
    },

    /// Pressure matrix inspection
    Matrix {
        #[command(subcommand)]
        command: MatrixCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Serve => commands::serve::run(&cli.config, &cli.host, cli.port).await,
        Commands::Tools { command } => commands::tools::handle_command(command, &cli.config).await,
        Commands::Chain { command } => commands::chain::handle_command(command, &cli.config).await,
        Commands::Probes { command } => {
            commands::probes::handle_command(command, &cli.config).await
        }
        Commands::Matrix { command } => {
            commands::matrix::handle_command(command, &cli.config).await
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
