//! Integration tests for the `tcc` CLI binary.
//!
//! Argument parsing, help output, shell completions and error handling,
//! all without a live portal.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `tcc` binary with env isolation.
///
/// Clears all `TCC_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn tcc_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("tcc");
    cmd.env("HOME", "/tmp/tcc-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/tcc-cli-test-nonexistent")
        .env_remove("TCC_PROFILE")
        .env_remove("TCC_URL")
        .env_remove("TCC_USERNAME")
        .env_remove("TCC_PASSWORD")
        .env_remove("TCC_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = tcc_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    tcc_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Total Connect Comfort")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("check")),
    );
}

#[test]
fn test_version_flag() {
    tcc_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tcc"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    tcc_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    tcc_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    tcc_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = tcc_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_status_without_config() {
    tcc_cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_password_without_username() {
    tcc_cmd()
        .args(["--password", "secret", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No credentials"));
}

#[test]
fn test_check_unreachable_portal() {
    let output = tcc_cmd()
        .args([
            "--url",
            "http://127.0.0.1:9",
            "--username",
            "someone@example.com",
            "--password",
            "secret",
            "--output",
            "plain",
            "check",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("cannot_connect"));
}

#[test]
fn test_config_show_no_config() {
    // Falls back to the default config when no file exists.
    tcc_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_use_unknown_profile() {
    tcc_cmd()
        .args(["config", "use", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_invalid_output_format() {
    let output = tcc_cmd()
        .args(["--output", "invalid", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_zero_watch_interval_rejected() {
    let output = tcc_cmd().args(["watch", "--interval", "0s"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("greater than zero"));
}

#[test]
fn test_set_temperature_needs_a_value() {
    let output = tcc_cmd().args(["set", "temperature"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_set_mode_rejects_unknown_mode() {
    let output = tcc_cmd().args(["set", "mode", "turbo"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("emheat") && text.contains("cool"), "{text}");
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_config_subcommands_exist() {
    tcc_cmd().args(["config", "--help"]).assert().success().stdout(
        predicate::str::contains("init")
            .and(predicate::str::contains("show"))
            .and(predicate::str::contains("profiles"))
            .and(predicate::str::contains("use"))
            .and(predicate::str::contains("set-password")),
    );
}

#[test]
fn test_set_subcommands_exist() {
    tcc_cmd().args(["set", "--help"]).assert().success().stdout(
        predicate::str::contains("temperature")
            .and(predicate::str::contains("mode"))
            .and(predicate::str::contains("fan")),
    );
}
