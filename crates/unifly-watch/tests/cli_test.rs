//! Integration tests for the `unifly-watch` binary.
//!
//! Argument parsing, store inspection and config errors, all without a
//! live controller.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

use unifly_watch_core::DeviceStore;

// ── Helpers ─────────────────────────────────────────────────────────

/// Command with config/data dirs pointed into `home` and `UNIFLY_WATCH_*` cleared.
fn watch_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("unifly-watch");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("RUST_LOG")
        .env_remove("UNIFLY_WATCH_CONFIG")
        .env_remove("UNIFLY_WATCH_DATABASE");
    cmd
}

fn seeded_db(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("devices.db");
    let store = DeviceStore::open(&path).unwrap();
    store.remember("aa:bb:cc:00:00:01", "Phone", "pixel").unwrap();
    store.remember("aa:bb:cc:00:00:02", "Laptop", "thinkpad").unwrap();
    path
}

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_usage() {
    let home = TempDir::new().unwrap();
    let output = watch_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    watch_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("events"))
            .and(predicate::str::contains("config")),
    );
}

#[test]
fn version_flag() {
    let home = TempDir::new().unwrap();
    watch_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completions_generate_for_bash() {
    let home = TempDir::new().unwrap();
    watch_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unifly-watch"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_path_honours_flag() {
    let home = TempDir::new().unwrap();
    watch_cmd(home.path())
        .args(["--config", "/etc/unifly-watch/config.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/unifly-watch/config.toml"));
}

#[test]
fn config_show_masks_secrets() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[controller]
url = "https://192.168.1.1"
username = "watcher"
password = "hunter2"
"#,
    );
    watch_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("watcher")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn run_without_notifier_settings_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[controller]
url = "https://192.168.1.1"
username = "watcher"
password = "hunter2"
"#,
    );
    watch_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["run", "--once"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("telegram_bot_token"));
}

#[test]
fn invalid_interval_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[watch]\ncheck_interval = 0\n");
    watch_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["run"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("check_interval"));
}

// ── Store inspection ────────────────────────────────────────────────

#[test]
fn devices_without_database_fails_with_storage_code() {
    let dir = TempDir::new().unwrap();
    watch_cmd(dir.path())
        .arg("--database")
        .arg(dir.path().join("missing.db"))
        .arg("devices")
        .assert()
        .code(9)
        .stderr(predicate::str::contains("not found"));
    assert!(!dir.path().join("missing.db").exists());
}

#[test]
fn devices_lists_remembered_devices_as_json() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);
    let output = watch_cmd(dir.path())
        .arg("--database")
        .arg(&db)
        .args(["devices", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["id"], "aa:bb:cc:00:00:01");
    assert_eq!(devices[0]["display_name"], "Phone");
    assert!(devices[0]["last_seen_absent"].is_null());
}

#[test]
fn devices_table_shows_names() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);
    watch_cmd(dir.path())
        .arg("--database")
        .arg(&db)
        .arg("devices")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Laptop")
                .and(predicate::str::contains("thinkpad"))
                .and(predicate::str::contains("present")),
        );
}

#[test]
fn events_are_newest_first_and_limited() {
    let dir = TempDir::new().unwrap();
    let db = seeded_db(&dir);
    watch_cmd(dir.path())
        .arg("--database")
        .arg(&db)
        .args(["events", "--limit", "1", "-o", "plain"])
        .assert()
        .success()
        .stdout("added\taa:bb:cc:00:00:02\n");
}
