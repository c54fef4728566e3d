//! The SQL explorer: gated by `ENABLE_SQL_EXPLORER`, read-only statements
//! only.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use predicates::prelude::*;

use crate::cli_tests::{dockyard, json_stdout};

#[test]
fn explorer_is_disabled_by_default() {
    dockyard()
        .args(["db", "tables", "app-db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SQL explorer is disabled"));
}

#[test]
fn tables_are_listed_when_enabled() {
    dockyard()
        .env("ENABLE_SQL_EXPLORER", "true")
        .args(["db", "tables", "app-db"])
        .assert()
        .success()
        .stdout(predicate::str::contains("users"))
        .stdout(predicate::str::contains("ROWS (EST.)"));
}

#[test]
fn schema_of_an_unknown_table_fails() {
    dockyard()
        .env("ENABLE_SQL_EXPLORER", "1")
        .args(["db", "schema", "app-db", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn preview_json_has_columns_and_rows() {
    let value = json_stdout(
        dockyard()
            .env("ENABLE_SQL_EXPLORER", "true")
            .args(["--json", "db", "preview", "app-db", "users"]),
    );
    assert_eq!(value["columns"][0], "id");
    assert_eq!(value["row_count"], 3);
}

#[test]
fn multi_statement_query_is_rejected() {
    dockyard()
        .env("ENABLE_SQL_EXPLORER", "true")
        .args(["db", "query", "app-db", "SELECT 1; DROP TABLE users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no semicolons"));
}

#[test]
fn query_reads_sql_from_stdin() {
    dockyard()
        .env("ENABLE_SQL_EXPLORER", "true")
        .args(["db", "query", "app-db", "-"])
        .write_stdin("SELECT * FROM users")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"))
        .stdout(predicate::str::contains("(3 rows)"));
}

#[test]
fn semicolon_inside_a_literal_is_accepted() {
    dockyard()
        .env("ENABLE_SQL_EXPLORER", "true")
        .args(["db", "query", "app-db", "SELECT '; DROP TABLE x' AS note"])
        .assert()
        .success();
}
