// Copyright (c) 2026 Opspulse
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end chain execution over the real subprocess runtime.

#![cfg(unix)]

use opspulse_core::application::chain::ChainExecutor;
use opspulse_core::application::execution::ExecutionEngine;
use opspulse_core::domain::chain::ChainTask;
use opspulse_core::domain::tool::{ExecStatus, ToolDescriptor, ToolId};
use opspulse_core::infrastructure::catalog::ToolCatalog;
use opspulse_core::infrastructure::runtime::ProcessRuntime;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn tool(id: &str, executable: PathBuf) -> ToolDescriptor {
    ToolDescriptor {
        id: ToolId::new(id),
        display_name: id.to_string(),
        description: String::new(),
        executable,
        category: "sensors".to_string(),
    }
}

fn executor(catalog: ToolCatalog) -> ChainExecutor {
    let engine = Arc::new(ExecutionEngine::new(
        Arc::new(catalog),
        Arc::new(ProcessRuntime::new(64 * 1024)),
    ));
    ChainExecutor::new(engine, Duration::from_secs(10))
}

fn task(id: &str, stop_on_error: bool) -> ChainTask {
    ChainTask {
        tool_id: ToolId::new(id),
        payload: serde_json::json!({}),
        stop_on_error,
    }
}

#[tokio::test]
async fn chain_of_real_processes_runs_in_order() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("order.log");
    let first = script(&dir, "first", &format!("echo first >> {}", log.display()));
    let second = script(&dir, "second", &format!("echo second >> {}", log.display()));

    let catalog =
        ToolCatalog::from_descriptors(vec![tool("first", first), tool("second", second)]);
    let report = executor(catalog)
        .execute(vec![task("first", false), task("second", false)])
        .await;

    assert!(report.succeeded());
    assert!(!report.halted);
    let order = std::fs::read_to_string(&log).unwrap();
    assert_eq!(order, "first\nsecond\n");
}

#[tokio::test]
async fn missing_tool_with_stop_on_error_halts_the_chain() {
    let dir = TempDir::new().unwrap();
    let store = script(&dir, "store", "echo store metrics");
    let email = script(&dir, "email", "echo email metrics");

    let catalog = ToolCatalog::from_descriptors(vec![
        tool("store_sensor", store),
        tool("email_sensor", email),
    ]);
    let report = executor(catalog)
        .execute(vec![
            task("store_sensor", false),
            task("does_not_exist", true),
            task("email_sensor", false),
        ])
        .await;

    assert!(report.halted);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].status, ExecStatus::Success);
    assert_eq!(report.steps[1].status, ExecStatus::NotFound);
}

#[tokio::test]
async fn failure_without_stop_on_error_keeps_going() {
    let dir = TempDir::new().unwrap();
    let bad = script(&dir, "bad", "echo broken >&2\nexit 1");
    let good = script(&dir, "good", "echo fine");

    let catalog = ToolCatalog::from_descriptors(vec![tool("bad", bad), tool("good", good)]);
    let report = executor(catalog)
        .execute(vec![task("bad", false), task("good", false)])
        .await;

    assert!(!report.halted);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].status, ExecStatus::Error);
    assert!(report.steps[0].error.as_deref().unwrap().contains("broken"));
    assert_eq!(report.steps[1].status, ExecStatus::Success);
}

#[tokio::test]
async fn timed_out_task_halts_when_marked_stop_on_error() {
    let dir = TempDir::new().unwrap();
    let hang = script(&dir, "hang", "sleep 30");
    let after = script(&dir, "after", "echo never");

    let catalog = ToolCatalog::from_descriptors(vec![tool("hang", hang), tool("after", after)]);
    let engine = Arc::new(ExecutionEngine::new(
        Arc::new(catalog),
        Arc::new(ProcessRuntime::new(64 * 1024)),
    ));
    let executor = ChainExecutor::new(engine, Duration::from_millis(300));

    let report = executor
        .execute(vec![task("hang", true), task("after", false)])
        .await;

    assert!(report.halted);
    assert_eq!(report.steps.len(), 1);
    assert_eq!(report.steps[0].status, ExecStatus::Timeout);
}
