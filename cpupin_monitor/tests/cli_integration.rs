use assert_cmd::Command;
use predicates::prelude::*;

/// Helper to get the CLI command
fn monitor_cmd() -> Command {
    Command::cargo_bin("cpupin-monitor").unwrap()
}

#[test]
fn test_version_flag() {
    monitor_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cpupin-monitor"));
}

#[test]
fn test_help_shows_usage_and_options() {
    monitor_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--period"))
        .stdout(predicate::str::contains("PID"));
}

#[test]
fn test_missing_pid_is_rejected() {
    monitor_cmd().assert().failure();
}

#[test]
fn test_non_numeric_pid_is_rejected() {
    monitor_cmd()
        .arg("not-a-pid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_zero_period_is_rejected() {
    monitor_cmd()
        .args(["--period", "0", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_unknown_option_is_rejected() {
    monitor_cmd().args(["--frequency", "10", "1"]).assert().failure();
}
