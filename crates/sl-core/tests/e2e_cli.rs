//! CLI E2E tests for the operator commands.
//!
//! Validates:
//! - `check` reports resolved paths and store state as JSON
//! - Missing secrets and invalid settings exit with the config error code
//! - `init-store` creates the table once and reports `already_present` after
//! - Environment variables stand in for the path flags

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

// ============================================================================
// Helpers
// ============================================================================

fn sightline() -> Command {
    let mut cmd = cargo_bin_cmd!("sightline");
    cmd.timeout(Duration::from_secs(60));
    cmd.env_remove("SIGHTLINE_CONFIG")
        .env_remove("SIGHTLINE_SECRETS")
        .env_remove("SIGHTLINE_DATA")
        .env_remove("SIGHTLINE_LOG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_secrets(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("secrets.json");
    fs::write(&path, r#"{"validator": "validator-token", "secret": "S"}"#).unwrap();
    path
}

/// Command with every path pointed inside `dir`.
fn scoped(dir: &TempDir) -> Command {
    let secrets = write_secrets(dir.path());
    let mut cmd = sightline();
    cmd.arg("--config")
        .arg(dir.path().join("settings.json"))
        .arg("--secrets")
        .arg(secrets)
        .arg("--data-dir")
        .arg(dir.path().join("data"))
        .arg("-q");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("parse JSON")
}

// ============================================================================
// check
// ============================================================================

#[test]
fn test_check_reports_defaults() {
    let dir = tempdir().unwrap();
    let json = stdout_json(scoped(&dir).arg("check"));

    assert_eq!(json["status"], "ok");
    assert_eq!(json["using_defaults"], true);
    assert_eq!(json["protocol_version"], "2.0");
    assert_eq!(json["store_exists"], false);
    assert_eq!(json["table_present"], false);
    assert_eq!(json["secret_fingerprint"].as_str().unwrap().len(), 8);
    assert!(json["store_path"]
        .as_str()
        .unwrap()
        .ends_with("observations.sqlite3"));
    assert!(json["audit_path"].as_str().unwrap().ends_with("audit.log"));

    // check is read-only
    assert!(!dir.path().join("data").exists());
}

#[test]
fn test_check_never_prints_secret() {
    let dir = tempdir().unwrap();
    scoped(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("validator-token").not())
        .stdout(predicate::str::contains("\"S\"").not());
}

#[test]
fn test_check_missing_secrets_exits_10() {
    let dir = tempdir().unwrap();
    let output = sightline()
        .arg("--config")
        .arg(dir.path().join("settings.json"))
        .arg("--secrets")
        .arg(dir.path().join("absent.json"))
        .arg("--data-dir")
        .arg(dir.path())
        .arg("check")
        .assert()
        .code(10)
        .stderr(predicate::str::contains("secrets file not found"))
        .get_output()
        .stdout
        .clone();

    let json: Value = serde_json::from_slice(&output).expect("parse JSON");
    assert_eq!(json["status"], "invalid");
}

#[test]
fn test_check_invalid_settings_exits_10() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("settings.json"),
        r#"{"server": {"bind": "not-an-address"}}"#,
    )
    .unwrap();

    scoped(&dir)
        .arg("check")
        .assert()
        .code(10)
        .stderr(predicate::str::contains("server.bind"));
}

#[test]
fn test_check_unparseable_settings_exits_10() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("settings.json"), "{ nope").unwrap();

    scoped(&dir).arg("check").assert().code(10);
}

#[test]
fn test_env_vars_resolve_paths() {
    let dir = tempdir().unwrap();
    let secrets = write_secrets(dir.path());

    let json = stdout_json(
        sightline()
            .env("SIGHTLINE_CONFIG", dir.path().join("settings.json"))
            .env("SIGHTLINE_SECRETS", &secrets)
            .env("SIGHTLINE_DATA", dir.path().join("env-data"))
            .args(["-q", "check"]),
    );

    assert_eq!(json["status"], "ok");
    assert!(json["store_path"].as_str().unwrap().contains("env-data"));
}

// ============================================================================
// init-store
// ============================================================================

#[test]
fn test_init_store_is_idempotent() {
    let dir = tempdir().unwrap();

    let first = stdout_json(scoped(&dir).arg("init-store"));
    assert_eq!(first["status"], "created");

    let second = stdout_json(scoped(&dir).arg("init-store"));
    assert_eq!(second["status"], "already_present");

    let check = stdout_json(scoped(&dir).arg("check"));
    assert_eq!(check["store_exists"], true);
    assert_eq!(check["table_present"], true);
}

#[test]
fn test_init_store_unwritable_path_exits_13() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    // The store path is occupied by a directory.
    fs::create_dir_all(data.join("observations.sqlite3")).unwrap();

    scoped(&dir).arg("init-store").assert().code(13);
}

#[test]
fn test_init_store_missing_secrets_exits_10() {
    let dir = tempdir().unwrap();
    sightline()
        .arg("--secrets")
        .arg(dir.path().join("absent.json"))
        .arg("--config")
        .arg(dir.path().join("settings.json"))
        .arg("--data-dir")
        .arg(dir.path())
        .arg("init-store")
        .assert()
        .code(10);
    assert!(!dir.path().join("observations.sqlite3").exists());
}

#[test]
fn test_serve_rejects_zero_workers() {
    let dir = tempdir().unwrap();
    scoped(&dir)
        .args(["serve", "--bind", "127.0.0.1:0", "--workers", "0"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("server.workers"));
}
