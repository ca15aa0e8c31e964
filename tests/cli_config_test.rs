//! Integration tests for `sharebridge config` commands.

mod common;

use common::{TestEnv, parse_json};
use predicates::prelude::*;

#[test]
fn test_show_defaults_without_file() {
    let env = TestEnv::new();
    let output = env.sb().args(["config", "show"]).output().unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    assert_eq!(json["exists"], false);
    assert_eq!(json["options"]["environment"]["value"], "production");
    assert_eq!(json["options"]["environment"]["source"], "default");
    assert_eq!(json["options"]["auto_add"]["value"], true);
    assert_eq!(json["options"]["load_poll_interval_ms"]["value"], 200);
}

#[test]
fn test_show_reports_sources() {
    let env = TestEnv::new();
    env.write_config(
        r#"
        environment "dev"
        script-placement "head"
        cms-name "Leptos"
        "#,
    );

    let output = env
        .sb()
        .args(["config", "show", "--profile-id", "ra-cli"])
        .env("SHAREBRIDGE_ENVIRONMENT", "test")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = parse_json(&output.stdout);
    let options = &json["options"];
    assert_eq!(json["exists"], true);
    assert_eq!(options["environment"]["value"], "test");
    assert_eq!(options["environment"]["source"], "env:SHAREBRIDGE_ENVIRONMENT");
    assert_eq!(options["profile_id"]["source"], "cli");
    assert_eq!(options["script_placement"]["value"], "head");
    assert!(
        options["script_placement"]["source"]
            .as_str()
            .unwrap()
            .starts_with("file:")
    );
    assert_eq!(options["cms_name"]["value"], "Leptos");
    assert_eq!(
        json["script_url"],
        "http://cache-test.addthis.com/js/300/addthis_widget.js#pubid=ra-cli"
    );
}

#[test]
fn test_show_human() {
    let env = TestEnv::new();
    env.sb()
        .args(["-H", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(not found)"))
        .stdout(predicate::str::contains("environment:           production (default)"));
}

#[test]
fn test_init_writes_defaults_once() {
    let env = TestEnv::new();

    env.sb()
        .args(["-H", "config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Created"));

    let written = std::fs::read_to_string(env.config_path()).unwrap();
    assert!(written.contains("environment"));
    assert!(written.contains("production"));
    assert!(written.contains("load-poll-interval-ms"));

    env.sb()
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    env.sb()
        .args(["-H", "config", "init", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Overwrote"));
}

#[test]
fn test_init_then_show_reads_file() {
    let env = TestEnv::new();
    env.sb().args(["config", "init"]).assert().success();

    let output = env.sb().args(["config", "show"]).output().unwrap();
    let json = parse_json(&output.stdout);
    assert_eq!(json["exists"], true);
    assert!(
        json["options"]["environment"]["source"]
            .as_str()
            .unwrap()
            .starts_with("file:")
    );
}

#[test]
fn test_path_follows_config_flag() {
    let env = TestEnv::new();
    let other = env.dir.path().join("other.kdl");

    env.sb()
        .args(["-H", "--config"])
        .arg(&other)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("other.kdl"));
}
