// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! Tool catalog commands
//!
//! - `opspulse tools list` - List registered tools
//! - `opspulse tools run <id>` - Invoke one tool with an optional payload

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;

use crate::engine;
use opspulse_core::domain::tool::{ExecStatus, ExecutionRequest, ToolId};

#[derive(Subcommand)]
pub enum ToolsCommand {
    /// List registered tools
    List {
        /// Filter by category
        #[arg(long, value_name = "CATEGORY")]
        category: Option<String>,
    },

    /// Invoke a tool and print its output
    Run {
        /// Tool identifier (separator-insensitive)
        #[arg(value_name = "ID")]
        id: String,

        /// Payload passed to the tool as its single JSON argument
        #[arg(long, short = 'p', value_name = "JSON")]
        payload: Option<String>,

        /// Override the configured timeout, in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },
}

pub async fn handle_command(command: ToolsCommand, config_path: &Path) -> Result<()> {
    match command {
        ToolsCommand::List { category } => list_tools(config_path, category),
        ToolsCommand::Run {
            id,
            payload,
            timeout_ms,
        } => run_tool(config_path, id, payload, timeout_ms).await,
    }
}

fn list_tools(config_path: &Path, category: Option<String>) -> Result<()> {
    let services = engine::bootstrap(config_path)?;
    let catalog = services.state.engine.catalog();

    let tools: Vec<_> = match &category {
        Some(cat) => catalog.tools_in_category(cat).collect(),
        None => catalog.tools().collect(),
    };

    if tools.is_empty() {
        println!("{}", "No tools registered.".yellow());
        return Ok(());
    }

    for tool in tools {
        println!(
            "{:<24} {:<12} {}",
            tool.id.as_str().bold(),
            tool.category.dimmed(),
            tool.display_name
        );
        if !tool.description.is_empty() {
            println!("    {}", tool.description.dimmed());
        }
    }
    Ok(())
}

async fn run_tool(
    config_path: &Path,
    id: String,
    payload: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let services = engine::bootstrap(config_path)?;

    let payload = match payload {
        Some(raw) => serde_json::from_str(&raw).context("Payload is not valid JSON")?,
        None => serde_json::Value::Null,
    };
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(services.config.default_tool_timeout());

    let result = services
        .state
        .engine
        .execute(ExecutionRequest {
            tool_id: ToolId::new(id),
            payload,
            timeout,
        })
        .await;

    let status_line = format!("{} ({} ms)", result.status, result.duration_ms);
    match result.status {
        ExecStatus::Success => println!("{}", status_line.green().bold()),
        _ => println!("{}", status_line.red().bold()),
    }
    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr.red());
    }

    if result.status == ExecStatus::Success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
