//! Smoke tests for the sharebridge CLI.
//!
//! These tests verify basic CLI functionality:
//! - `sharebridge --version` outputs version info
//! - `sharebridge --help` outputs help text
//! - a subcommand is required

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_version_flag() {
    TestEnv::new()
        .sb()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sharebridge"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    TestEnv::new()
        .sb()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn test_no_args_shows_usage() {
    TestEnv::new()
        .sb()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_config_help() {
    TestEnv::new()
        .sb()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_errors_are_json_by_default() {
    TestEnv::new()
        .sb()
        .args(["script-url", "--environment", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""error""#))
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_errors_are_plain_with_human_flag() {
    TestEnv::new()
        .sb()
        .args(["-H", "script-url", "--profile-id", ""])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: "));
}
