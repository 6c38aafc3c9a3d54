//! Integration tests for the `arrowcast` CLI binary.
//!
//! These tests validate argument parsing, help output, configuration
//! handling and one-shot rendering against a mock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `arrowcast` binary with env isolation.
///
/// Clears all `ARROWCAST_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn arrowcast_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("arrowcast");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("ARROWCAST_PROFILE")
        .env_remove("ARROWCAST_SERVER")
        .env_remove("ARROWCAST_OUTPUT")
        .env_remove("ARROWCAST_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn bracket_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tournaments/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tournaments": {
                "df-12": {
                    "id": "df-12",
                    "dbid": 12,
                    "name": "DrunkenFall 12: The Return",
                    "scheduled": "2026-03-01T18:00:00Z",
                    "started": "2026-03-01T19:00:00Z",
                    "matches": [
                        {"index": 0, "kind": "semi", "ended": "2026-03-01T19:30:00Z"},
                        {"index": 1, "kind": "semi", "started": "2026-03-01T19:40:00Z",
                         "players": [{"person": {"id": "3", "nick": "cee"}, "kills": 7}]},
                        {"index": 2, "kind": "final"}
                    ]
                },
                "test-1": {"id": "test-1", "dbid": 1, "name": "Friday warmup"}
            }
        })))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = arrowcast_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("tournament brackets")
                .and(predicate::str::contains("tournaments"))
                .and(predicate::str::contains("watch"))
                .and(predicate::str::contains("stats")),
        );

    arrowcast_cmd(home.path())
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("tournament brackets"));
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("arrowcast"));
}

#[test]
fn test_tournaments_subcommands_exist() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .args(["tournaments", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("get"))
                .and(predicate::str::contains("credits")),
        );
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_list_without_server_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .args(["tournaments", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No server configured"));
}

#[test]
fn test_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .args(["--profile", "nope", "tournaments", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Profile 'nope' not found"));
}

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = arrowcast_cmd(home.path())
        .args(["--output", "yaml", "tournaments", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_add_then_profiles() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .args(["config", "add", "local", "--server", "http://localhost:42001"])
        .assert()
        .success();

    arrowcast_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* local"));

    arrowcast_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("server = \"http://localhost:42001\""));
}

#[test]
fn test_config_add_rejects_bad_server() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .args(["config", "add", "bad", "--server", "ftp://example.com"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("server"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    arrowcast_cmd(home.path())
        .args(["config", "use", "ghost"])
        .assert()
        .code(2);
}

// ── One-shot commands against a mock server ─────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tournaments_list_plain() {
    let server = bracket_server().await;
    let home = tempfile::tempdir().unwrap();

    arrowcast_cmd(home.path())
        .args(["--server", &server.uri(), "-o", "plain", "tournaments", "list"])
        .assert()
        .success()
        .stdout("df-12\n");

    arrowcast_cmd(home.path())
        .args([
            "--server",
            &server.uri(),
            "-o",
            "plain",
            "tournaments",
            "list",
            "--include-tests",
        ])
        .assert()
        .success()
        .stdout("df-12\ntest-1\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tournaments_get_by_dbid() {
    let server = bracket_server().await;
    let home = tempfile::tempdir().unwrap();

    arrowcast_cmd(home.path())
        .args(["--server", &server.uri(), "tournaments", "get", "12"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("DrunkenFall 12: The Return")
                .and(predicate::str::contains("Semis"))
                .and(predicate::str::contains("cee 7")),
        );

    arrowcast_cmd(home.path())
        .args(["--server", &server.uri(), "tournaments", "get", "99"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("tournament '99' not found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_server_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tournaments/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    arrowcast_cmd(home.path())
        .args(["--server", &server.uri(), "tournaments", "list"])
        .assert()
        .code(7);
}
