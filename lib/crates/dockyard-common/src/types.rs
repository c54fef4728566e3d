use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Best-effort lifecycle state of an app, derived from `ps:report` text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AppStatus {
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "stopped")]
    Stopped,
    /// Deployed, but the report did not say whether it is running.
    #[serde(rename = "deployed")]
    Deployed,
    #[default]
    #[serde(rename = "not deployed")]
    NotDeployed,
}

impl AppStatus {
    /// The label Dokku operators expect to see.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Deployed => "deployed",
            Self::NotDeployed => "not deployed",
        }
    }
}

impl std::fmt::Display for AppStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the apps list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppInfo {
    pub name: String,
    pub status: AppStatus,
    pub deployed: bool,
    pub process_count: u32,
    /// Process types in first-seen order.
    pub process_types: Vec<String>,
    pub process_type_counts: BTreeMap<String, u32>,
    pub domains: Vec<String>,
}

/// Output of `git:report`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GitReport {
    pub deploy_branch: String,
    pub source_hash: String,
    pub last_updated_at: String,
}

/// A single container reported by `ps:report APP`, e.g. `web.1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub process_type: String,
    pub status: String,
}

/// Detail view of one app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppMeta {
    /// Raw `ps:report` key/value pairs.
    pub ps_report: BTreeMap<String, String>,
    pub git_report: Option<GitReport>,
    pub git_rev: String,
    pub app_type: String,
    pub github_repo: String,
    pub processes: Vec<ProcessEntry>,
}

/// Configured scale of one process type (`ps:scale APP`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessScale {
    #[serde(rename = "type")]
    pub process_type: String,
    pub count: u32,
}

/// A `Key: value` line of a Dokku report, kept in report order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportField {
    pub key: String,
    pub value: String,
}

/// A Postgres service and the apps linked to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DatabaseInfo {
    pub name: String,
    pub links: Vec<String>,
}

/// Result of a read-only SQL query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
}

impl QueryResult {
    /// Builds a result, deriving `row_count` from `rows`.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }
}

/// A relation in the `public` schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub row_estimate: String,
}

/// A column of a table, from `information_schema.columns`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub column: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: String,
    pub default_value: String,
}
