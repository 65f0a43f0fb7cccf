//! Smoke tests for the swagcheck CLI
//!
//! These tests drive the binary end to end against the simulated shop.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a command for the swagcheck binary with a clean environment
fn swagcheck() -> Command {
    let mut cmd = Command::cargo_bin("swagcheck").expect("swagcheck binary should exist");
    cmd.env_remove("SWAGCHECK_ROOT")
        .env_remove("SWAGCHECK_BASE_URL")
        .env_remove("SWAGCHECK_MAX_RETRIES")
        .env_remove("RUST_LOG");
    cmd
}

fn root_arg(dir: &TempDir) -> String {
    dir.path().display().to_string()
}

fn attempt_dir(root: &Path, n: u32) -> PathBuf {
    root.join(format!(
        "artifacts/test_cart/TestCart/test_cart_badge_counts_items/attempt_{n}"
    ))
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    swagcheck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_flag() {
    swagcheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("simulate"))
        .stdout(predicate::str::contains("show-trace"))
        .stdout(predicate::str::contains("login-state"));
}

#[test]
fn test_no_args_shows_help() {
    swagcheck().assert().failure();
}

#[test]
fn test_report_help() {
    swagcheck()
        .args(["report", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--ledger"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_prints_defaults() {
    swagcheck()
        .args(["config", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_retries: 1"))
        .stdout(predicate::str::contains("trace_viewer_command"));
}

#[test]
fn test_config_file_and_env() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("suite.yaml");
    fs::write(&file, "max_retries: 4\n").unwrap();

    swagcheck()
        .args(["--config", file.to_str().unwrap(), "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_retries: 4"));

    swagcheck()
        .env("SWAGCHECK_MAX_RETRIES", "2")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_retries: 2"));
}

#[test]
fn test_log_json_emits_json_lines() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args(["--log-json", "-v", "reset", "--root", &root_arg(&dir)])
        .assert()
        .success()
        .stderr(predicate::str::starts_with("{"))
        .stderr(predicate::str::contains("\"level\":\"INFO\""));
}

#[test]
fn test_bad_env_override_fails() {
    swagcheck()
        .env("SWAGCHECK_MAX_RETRIES", "many")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SWAGCHECK_MAX_RETRIES"));
}

// ============================================================================
// Workspace Tests
// ============================================================================

#[test]
fn test_reset_creates_directories() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args(["--color", "never", "reset", "--root", &root_arg(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS workspace reset"));
    for name in ["artifacts", "videos", "tracing", "report-results", "storage"] {
        assert!(dir.path().join(name).is_dir(), "{name} missing");
    }
}

#[test]
fn test_login_state_simulated() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args(["login-state", "--simulated", "--root", &root_arg(&dir)])
        .assert()
        .success();
    let state = fs::read_to_string(dir.path().join("storage/login.json")).unwrap();
    assert!(state.contains("cookies"));
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_simulate_flaky_run() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args(["--color", "never", "simulate", "--root", &root_arg(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains("AssertionError: 2 != 3"))
        .stdout(predicate::str::contains("flaky: passed after 2 attempts"));

    assert!(attempt_dir(dir.path(), 1).join("failure.png").is_file());
    assert!(!attempt_dir(dir.path(), 2).exists());
    let results: Vec<_> = fs::read_dir(dir.path().join("report-results"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with("-result.json"))
        .collect();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_simulate_all_failures_exit_nonzero() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args([
            "simulate",
            "--root",
            &root_arg(&dir),
            "--fail-attempts",
            "9",
            "--max-retries",
            "2",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed after 3 attempts"));
    assert!(attempt_dir(dir.path(), 3).join("url.txt").is_file());
}

#[test]
fn test_report_from_saved_ledger() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args(["simulate", "--save-ledger", "--root", &root_arg(&dir)])
        .assert()
        .success();

    let ledger = dir
        .path()
        .join("report-results/test_cart.TestCart.test_cart_badge_counts_items-ledger.json");
    assert!(ledger.is_file());
    let out = dir.path().join("summary.html");
    swagcheck()
        .args([
            "report",
            "--ledger",
            ledger.to_str().unwrap(),
            "--test",
            "test_cart::TestCart::test_cart_badge_counts_items",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let html = fs::read_to_string(out).unwrap();
    assert!(html.contains("Attempt Summary: test_cart::TestCart::test_cart_badge_counts_items"));
    assert!(html.contains("Failed 1 times, then passed on retry"));
    assert!(html.contains("data:image/png;base64,"));
}

#[test]
fn test_report_rejects_bad_test_name() {
    let dir = TempDir::new().unwrap();
    let ledger = dir.path().join("ledger.json");
    fs::write(&ledger, "[]").unwrap();
    swagcheck()
        .args(["report", "--ledger", ledger.to_str().unwrap(), "--test", "nocolons"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_show_trace_extracts_archive() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args(["simulate", "--root", &root_arg(&dir)])
        .assert()
        .success();

    let trace = attempt_dir(dir.path(), 1).join("trace.zip");
    swagcheck()
        .args(["show-trace", trace.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("python -m http.server 9323"));
    assert!(attempt_dir(dir.path(), 1)
        .join("trace-viewer/index.html")
        .is_file());
}

#[test]
fn test_show_trace_missing_archive() {
    let dir = TempDir::new().unwrap();
    swagcheck()
        .args(["show-trace", dir.path().join("trace.zip").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("trace archive not found"));
}
