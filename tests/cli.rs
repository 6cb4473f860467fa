//! Process-level tests for the `sqlalert` binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_missing_flags_exit_non_zero() {
    Command::cargo_bin("sqlalert")
        .unwrap()
        .env_remove("SQLALERT_DATABASE__DSN")
        .env_remove("SQLALERT_WEBHOOK__URL")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing required flag -dsn"));
}

#[test]
fn test_invalid_dsn_exits_before_waiting() {
    Command::cargo_bin("sqlalert")
        .unwrap()
        .args([
            "-dsn",
            "not a connection string",
            "-dingdingURL",
            "http://127.0.0.1:1/robot/send",
        ])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to listen to channel"))
        .stderr(predicate::str::contains("Waiting for notifications").not());
}

#[test]
fn test_help_lists_historical_flags() {
    Command::cargo_bin("sqlalert")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dsn"))
        .stdout(predicate::str::contains("--dingdingURL"));
}
