//! Read-only SQL path: statement validation, row capping, the psql wrapper
//! and CSV decoding of the result.
//!
//! [`validate_sql_statement`] is a textual defence-in-depth filter, not a SQL
//! parser. It rejects anything that is not a single read-only statement by
//! looking at the text alone; the database role and the server-side
//! statement timeout remain the real boundary.

use std::sync::LazyLock;

use dockyard_common::QueryResult;
use regex::Regex;

use crate::domain::error::{DokkuError, DokkuResult};
use crate::domain::validate::TableName;

/// Maximum statement size in bytes.
pub const MAX_SQL_BYTES: usize = 10_000;

/// Row cap appended to statements without their own `LIMIT`.
pub const DEFAULT_ROW_CAP: u32 = 1000;

/// Rows shown by a table preview.
pub const PREVIEW_ROWS: u32 = 50;

/// Server-side statement timeout sent ahead of every query.
pub const STATEMENT_TIMEOUT: &str = "5s";

static LEADING_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(SELECT|WITH|EXPLAIN)\b").expect("valid regex")
});

static FORBIDDEN_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE|CREATE|GRANT|REVOKE|COPY|DO|CALL)\b",
    )
    .expect("valid regex")
});

static STRING_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"'[^']*'").expect("valid regex")
});

static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\bLIMIT\b").expect("valid regex")
});

static META_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(Output format|Time:|Pager|Null display|\(\d+ rows?\)|SET$)").expect("valid regex")
});

/// A single read-only statement that passed [`validate_sql_statement`], or a
/// catalog query built here from a validated table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement(String);

impl SqlStatement {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn sql_error(message: &str) -> DokkuError {
    DokkuError::validation("SQL query", message)
}

/// Validate caller-supplied SQL.
///
/// # Errors
///
/// Returns a `Validation` error when the statement is empty, too large,
/// contains `;` outside a single-quoted literal, does not start with
/// `SELECT`/`WITH`/`EXPLAIN`, or contains a mutating keyword outside a
/// single-quoted literal.
pub fn validate_sql_statement(raw: &str) -> DokkuResult<SqlStatement> {
    let sql = raw.trim();
    if sql.is_empty() {
        return Err(sql_error("No SQL query provided"));
    }
    if sql.len() > MAX_SQL_BYTES {
        return Err(sql_error("Query too large (max 10KB)"));
    }
    let stripped = STRING_LITERAL_RE.replace_all(sql, "''");
    if stripped.contains(';') {
        return Err(sql_error(
            "Multi-statement queries not allowed (no semicolons)",
        ));
    }

    let normalized = sql
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if !LEADING_KEYWORD_RE.is_match(&normalized) {
        return Err(sql_error(
            "Only SELECT, WITH, and EXPLAIN queries are allowed",
        ));
    }

    if FORBIDDEN_KEYWORD_RE.is_match(&stripped) {
        return Err(sql_error(
            "Query contains forbidden DML/DDL keywords (INSERT, UPDATE, DELETE, DROP, etc.)",
        ));
    }

    Ok(SqlStatement(sql.to_string()))
}

/// Relations in the `public` schema with their planner row estimate.
#[must_use]
pub fn tables_statement() -> SqlStatement {
    SqlStatement(
        "SELECT c.relname AS name, \
         CASE c.relkind WHEN 'r' THEN 'table' WHEN 'v' THEN 'view' \
         WHEN 'm' THEN 'materialized view' ELSE c.relkind::text END AS type, \
         c.reltuples::bigint AS row_estimate \
         FROM pg_class c \
         JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE n.nspname = 'public' AND c.relkind IN ('r','v','m') \
         ORDER BY c.relname"
            .to_string(),
    )
}

/// Column listing for one table. The name is interpolated, so it must be a
/// validated [`TableName`].
#[must_use]
pub fn table_schema_statement(table: &TableName) -> SqlStatement {
    SqlStatement(format!(
        "SELECT column_name, data_type, is_nullable, \
         COALESCE(column_default, '-') AS column_default \
         FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name = '{table}' \
         ORDER BY ordinal_position"
    ))
}

/// First [`PREVIEW_ROWS`] rows of a table.
#[must_use]
pub fn table_preview_statement(table: &TableName) -> SqlStatement {
    SqlStatement(format!(
        "SELECT * FROM \"{table}\" LIMIT {PREVIEW_ROWS}"
    ))
}

/// Append ` LIMIT 1000` unless the statement already has a `LIMIT` word.
#[must_use]
pub fn apply_row_cap(statement: &SqlStatement) -> String {
    let sql = statement.as_str();
    if LIMIT_RE.is_match(&sql.to_uppercase()) {
        return sql.to_string();
    }
    let base = sql.trim_end().trim_end_matches(';').trim_end();
    format!("{base} LIMIT {DEFAULT_ROW_CAP}")
}

/// The stdin script fed to `postgres:connect`.
#[must_use]
pub fn wrap_for_psql(capped_sql: &str) -> String {
    format!("SET statement_timeout = '{STATEMENT_TIMEOUT}';\n\\pset format csv\n{capped_sql};")
}

/// Split psql output into CSV records. A newline inside a quoted field does
/// not end the record.
#[must_use]
pub fn logical_lines(output: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in output.chars() {
        match ch {
            '"' => {
                // A doubled quote toggles twice, leaving the state unchanged.
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '\n' if !in_quotes => {
                lines.push(strip_cr(std::mem::take(&mut current)));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        lines.push(strip_cr(current));
    }
    lines
}

fn strip_cr(mut line: String) -> String {
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

/// Whether `line` is psql chatter rather than result data.
#[must_use]
pub fn is_meta_line(line: &str) -> bool {
    META_LINE_RE.is_match(line)
}

/// Decode one CSV record. `""` inside a quoted field is a literal quote and
/// commas inside quotes do not split.
#[must_use]
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    current.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => current.push(ch),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            }
        }
    }
    fields.push(current);
    fields
}

/// Encode one CSV record the way psql's `csv` format does.
#[must_use]
pub fn encode_csv_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|field| {
            let field = field.as_ref();
            if field.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Turn raw psql output into a [`QueryResult`]: drop meta lines, take the
/// first remaining record as the header.
#[must_use]
pub fn parse_query_output(output: &str) -> QueryResult {
    let mut records = logical_lines(output.trim())
        .into_iter()
        .filter(|line| !line.is_empty() && !is_meta_line(line));

    let Some(header) = records.next() else {
        return QueryResult::default();
    };
    let columns = parse_csv_line(&header);
    let rows = records.map(|line| parse_csv_line(&line)).collect();
    QueryResult::new(columns, rows)
}
