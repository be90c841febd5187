//! Binary-level tests: exit codes, error rendering and JSON envelopes.
//!
//! Every invocation points `CHAINPROBE_CONFIG` at a temp file so a real
//! user config never leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use wiremock::MockServer;

mod common;

use chainprobe::test_utils::{
    TestDir, has_ansi_codes, healthy_provider, make_test_config_toml, mock_latest_block,
    mock_status, test_hash,
};
use common::logger::TestLogger;

#[allow(deprecated)]
fn chainprobe(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("chainprobe").unwrap();
    cmd.env("CHAINPROBE_CONFIG", config)
        .env_remove("CHAINPROBE_PROVIDERS")
        .env_remove("CHAINPROBE_TIMEOUT")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}

// =============================================================================
// Argument and configuration errors
// =============================================================================

#[test]
#[allow(deprecated)]
fn invalid_command_is_rejected() {
    Command::cargo_bin("chainprobe")
        .unwrap()
        .arg("notacommand")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized").or(predicate::str::contains("error")));
}

#[test]
#[allow(deprecated)]
fn version_flag() {
    Command::cargo_bin("chainprobe")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn empty_config_exits_with_no_providers() {
    let log = TestLogger::new("empty_config_exits_with_no_providers");
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", "");

    log.phase("execute");
    chainprobe(&config)
        .arg("health")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("CHP-P001"))
        .stderr(predicate::str::contains("Hint:"));
    log.finish_ok();
}

#[test]
fn missing_explicit_config_exits_with_config_error() {
    let dir = TestDir::new();
    chainprobe(&dir.file_path("nope.toml"))
        .arg("health")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CHP-C001"));
}

#[test]
fn malformed_config_exits_with_config_error() {
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", "[[providers]\nname = ");
    chainprobe(&config)
        .arg("consistency")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("CHP-C002"));
}

#[test]
fn duplicate_provider_names_are_rejected() {
    let dir = TestDir::new();
    let config = dir.create_file(
        "config.toml",
        &make_test_config_toml(&[("a", "http://127.0.0.1:1"), ("a", "http://127.0.0.1:2")]),
    );
    chainprobe(&config).arg("health").assert().code(2);
}

#[test]
fn json_errors_are_structured() {
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", "");
    let output = chainprobe(&config)
        .args(["health", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    // log lines may precede the error document
    let stderr = String::from_utf8(output.stderr).unwrap();
    let err: Value = serde_json::from_str(stderr.lines().last().unwrap()).unwrap();
    assert_eq!(err["errorCode"], "CHP-P001");
    assert_eq!(err["exitCode"], 3);
}

// =============================================================================
// Commands against mock providers
// =============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn health_json_envelope() {
    let log = TestLogger::new("health_json_envelope");
    let up = healthy_provider(1_234, &test_hash(1)).await;
    let down = MockServer::start().await;
    mock_status(&down, 500).await;

    let dir = TestDir::new();
    let config = dir.create_file(
        "config.toml",
        &make_test_config_toml(&[("up", &up.uri()), ("down", &down.uri())]),
    );

    log.phase("execute");
    let output = chainprobe(&config)
        .args(["health", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["schemaVersion"], "chainprobe.v1");
    assert_eq!(json["command"], "health");
    assert_eq!(json["data"][0]["provider"], "up");
    assert_eq!(json["data"][0]["healthy"], true);
    assert_eq!(json["data"][0]["height"], 1_234);
    assert_eq!(json["data"][1]["healthy"], false);
    assert_eq!(json["data"][1]["error"]["kind"], "server_error");
    log.finish_ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn providers_from_environment_replace_file_providers() {
    let up = healthy_provider(7, &test_hash(7)).await;
    let dir = TestDir::new();
    let config = dir.create_file(
        "config.toml",
        &make_test_config_toml(&[("unused", "http://127.0.0.1:1")]),
    );

    let output = chainprobe(&config)
        .env("CHAINPROBE_PROVIDERS", format!("envp={}", up.uri()))
        .args(["health", "--json"])
        .output()
        .unwrap();

    let json = stdout_json(&output);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["provider"], "envp");
}

#[tokio::test(flavor = "multi_thread")]
async fn consistency_issues_become_warnings_not_failures() {
    let a = healthy_provider(50, &test_hash(0xaaa)).await;
    let b = healthy_provider(50, &test_hash(0xbbb)).await;
    let dir = TestDir::new();
    let config = dir.create_file(
        "config.toml",
        &make_test_config_toml(&[("a", &a.uri()), ("b", &b.uri())]),
    );

    let output = chainprobe(&config)
        .args(["consistency", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["data"]["consistent"], false);
    assert_eq!(json["data"]["referenceHeight"], 50);
    let warnings = json["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("hash mismatch"));
}

#[tokio::test(flavor = "multi_thread")]
async fn best_fetches_latest_block_from_winner() {
    let winner = healthy_provider(900, &test_hash(0x900)).await;
    mock_latest_block(&winner, 900, &test_hash(0x900)).await;
    let down = MockServer::start().await;
    mock_status(&down, 503).await;

    let dir = TestDir::new();
    let config = dir.create_file(
        "config.toml",
        &make_test_config_toml(&[("down", &down.uri()), ("winner", &winner.uri())]),
    );

    let output = chainprobe(&config)
        .args(["best", "--json", "-n", "2"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["command"], "best");
    assert_eq!(json["data"]["selection"]["provider"]["name"], "winner");
    assert_eq!(json["data"]["latestBlock"]["number"], 900);
    assert_eq!(json["data"]["ranking"][1]["name"], "down");
    assert_eq!(json["data"]["ranking"][1]["excluded"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn rank_human_output_is_plain_without_color() {
    let a = healthy_provider(10, &test_hash(1)).await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&[("alpha", &a.uri())]));

    let output = chainprobe(&config)
        .args(["rank", "--no-color"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("alpha"));
    assert!(!has_ansi_codes(&stdout));
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_stops_after_requested_rounds() {
    let log = TestLogger::new("watch_stops_after_requested_rounds");
    let a = healthy_provider(3, &test_hash(3)).await;
    let dir = TestDir::new();
    let config = dir.create_file("config.toml", &make_test_config_toml(&[("a", &a.uri())]));

    log.phase("execute");
    let output = chainprobe(&config)
        .args(["watch", "--json", "--interval", "1", "--rounds", "2"])
        .timeout(std::time::Duration::from_secs(30))
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["command"], "watch");
    assert_eq!(lines[0]["data"]["round"], 1);
    assert_eq!(lines[1]["data"]["round"], 2);
    assert_eq!(lines[2]["command"], "watch-summary");
    assert_eq!(lines[2]["data"]["rounds"], 2);
    assert_eq!(lines[2]["data"]["inconsistentRounds"], 0);
    log.finish_ok();
}
