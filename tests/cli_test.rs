use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// The binary in an empty directory with no inherited configuration
fn isolated() -> (Command, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("volume-refill").unwrap();
    cmd.env_clear()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .current_dir(dir.path());
    (cmd, dir)
}

#[test]
fn test_help_lists_commands() {
    let (mut cmd, _dir) = isolated();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("--guest-url"));
}

#[test]
fn test_missing_credentials_exit_code() {
    let (mut cmd, _dir) = isolated();
    cmd.arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no credentials configured"));
}

#[test]
fn test_missing_contract_id_exit_code() {
    let (mut cmd, _dir) = isolated();
    cmd.args(["status", "--username", "alice", "--password", "secret"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no contract id"));
}

#[test]
fn test_json_errors_go_to_stdout() {
    let (mut cmd, _dir) = isolated();
    cmd.args(["status", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"error\""));
}

#[test]
fn test_invalid_threshold_rejected() {
    let (mut cmd, _dir) = isolated();
    cmd.args(["--threshold=-1", "--guest-url", "https://control-center.1und1.de/mc/abc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("threshold"));
}

#[test]
fn test_broken_config_file_rejected() {
    let (mut cmd, dir) = isolated();
    fs::write(dir.path().join("volume-refill.toml"), "[monitor\n").unwrap();
    cmd.arg("login")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("volume-refill.toml"));
}
