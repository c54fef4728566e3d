//! End-to-end checks of argument parsing, output modes and the read-only
//! switch, against the in-memory backend.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;

pub fn dockyard() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dockyard"));
    cmd.env("NO_COLOR", "1")
        .env_remove("DOKKU_SSH_KEY")
        .env_remove("ENABLE_SQL_EXPLORER")
        .env_remove("ENABLE_DESTRUCTIVE_ACTIONS")
        .env_remove("RUST_LOG");
    cmd
}

pub fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    serde_json::from_slice(&output.stdout).expect("stdout is one JSON document")
}

// --- Help and version ---

#[test]
fn no_args_shows_help_and_exits_two() {
    dockyard().assert().code(2).stderr(predicate::str::contains(
        "Operator console for a Dokku host",
    ));
}

#[test]
fn help_lists_the_command_groups() {
    dockyard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("apps"))
        .stdout(predicate::str::contains("postgres"))
        .stdout(predicate::str::contains("db"));
}

#[test]
fn version_command_shows_version() {
    dockyard()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dockyard 0.1.0"));
}

#[test]
fn version_command_json() {
    let value = json_stdout(dockyard().args(["version", "--json"]));
    assert_eq!(value["version"], "0.1.0");
}

// --- Backend selection ---

#[test]
fn missing_key_warns_and_uses_the_in_memory_backend() {
    dockyard()
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("Connected to in-memory"))
        .stderr(predicate::str::contains("DOKKU_SSH_KEY is not set"));
}

#[test]
fn malformed_key_is_a_settings_error() {
    dockyard()
        .env("DOKKU_SSH_KEY", "not base64!!")
        .arg("ping")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// --- Apps ---

#[test]
fn apps_list_renders_a_table() {
    dockyard()
        .args(["apps", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("api-server"))
        .stdout(predicate::str::contains("api.example.com"));
}

#[test]
fn apps_list_json_is_machine_readable() {
    let value = json_stdout(dockyard().args(["--json", "apps", "list"]));
    let apps = value["apps"].as_array().unwrap();
    let server = apps.iter().find(|a| a["name"] == "api-server").unwrap();
    assert_eq!(server["status"], "running");
}

#[test]
fn apps_list_names_only() {
    dockyard()
        .args(["apps", "list", "--names"])
        .assert()
        .success()
        .stdout(predicate::str::contains("staging-worker"))
        .stdout(predicate::str::contains("STATUS").not());
}

#[test]
fn invalid_app_name_is_rejected() {
    dockyard()
        .args(["apps", "create", "Bad_Name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid app name"));
}

#[test]
fn json_errors_carry_a_stable_code() {
    let mut cmd = dockyard();
    cmd.args(["--json", "apps", "create", "Bad_Name"]);
    cmd.assert().failure();
    let value = json_stdout(&mut cmd);
    assert_eq!(value["error"], true);
    assert_eq!(value["code"], "VALIDATION_ERROR");
}

#[test]
fn unknown_app_reports_the_remote_message() {
    dockyard()
        .args(["apps", "restart", "ghost-app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("App ghost-app does not exist"));
}

#[test]
fn destroy_with_yes_skips_the_prompt() {
    dockyard()
        .args(["apps", "destroy", "api-cron", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Destroyed api-cron"));
}

#[test]
fn app_info_shows_processes() {
    dockyard()
        .args(["apps", "info", "api-server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web.1"))
        .stdout(predicate::str::contains("herokuish"));
}

#[test]
fn raw_app_report_is_passed_through() {
    dockyard()
        .args(["apps", "info", "api-server", "--raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=====> api-server ps information"));
}

// --- Read-only mode ---

#[test]
fn read_only_mode_blocks_mutations() {
    dockyard()
        .env("ENABLE_DESTRUCTIVE_ACTIONS", "false")
        .args(["apps", "stop", "api-server"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Destructive actions are disabled"));
}

#[test]
fn read_only_mode_still_allows_reads() {
    dockyard()
        .env("ENABLE_DESTRUCTIVE_ACTIONS", "0")
        .args(["apps", "list"])
        .assert()
        .success();
}

#[test]
fn invalid_flag_value_is_a_settings_error() {
    dockyard()
        .env("ENABLE_DESTRUCTIVE_ACTIONS", "maybe")
        .args(["apps", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

// --- Processes, logs, config, domains ---

#[test]
fn scale_accepts_type_count_pairs() {
    dockyard()
        .args(["ps", "scale", "api-server", "web=3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scaled api-server"));
}

#[test]
fn scale_rejects_malformed_pairs() {
    dockyard()
        .args(["ps", "scale", "api-server", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected TYPE=COUNT"));
}

#[test]
fn scale_without_pairs_shows_counts() {
    dockyard()
        .args(["ps", "scale", "api-server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web"))
        .stdout(predicate::str::contains("2"));
}

#[test]
fn logs_print_recent_lines() {
    dockyard()
        .args(["logs", "api-server", "--num", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[mock] api-server"));
}

#[test]
fn config_show_json() {
    let value = json_stdout(dockyard().args(["config", "show", "api-server", "--json"]));
    assert_eq!(value["app"], "api-server");
    assert_eq!(value["config"]["PORT"], "5000");
}

#[test]
fn config_set_requires_assignments() {
    dockyard()
        .args(["config", "set", "api-server", "PORT"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn config_set_reports_the_keys() {
    dockyard()
        .args(["config", "set", "api-server", "LOG_LEVEL=debug", "--no-restart"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set LOG_LEVEL on api-server"));
}

#[test]
fn domains_list() {
    dockyard()
        .args(["domains", "list", "api-server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api.example.com"));
}

#[test]
fn invalid_domain_is_rejected() {
    dockyard()
        .args(["domains", "add", "api-server", "Not A Domain"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid domain"));
}

// --- Postgres and resources ---

#[test]
fn postgres_list_shows_links() {
    dockyard()
        .args(["postgres", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app-db"))
        .stdout(predicate::str::contains("staging-db"));
}

#[test]
fn linked_service_cannot_be_destroyed() {
    dockyard()
        .args(["postgres", "destroy", "app-db", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot delete linked service"));
}

#[test]
fn postgres_info_json() {
    let value = json_stdout(dockyard().args(["--json", "postgres", "info", "app-db"]));
    assert_eq!(value["name"], "app-db");
    assert!(value["fields"].as_array().is_some_and(|f| !f.is_empty()));
}

#[test]
fn resource_limit_needs_a_value() {
    dockyard()
        .args(["resources", "limit", "api-server"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--memory"));
}

#[test]
fn resource_limit_for_a_worker() {
    dockyard()
        .args([
            "resources",
            "limit",
            "api-worker",
            "--memory",
            "256m",
            "--process-type",
            "worker",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated worker limits on api-worker"));
}
