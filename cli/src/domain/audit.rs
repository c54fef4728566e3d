//! Shape of one audit record.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::safety::Redactor;

/// Longest error excerpt kept in an audit record, in characters.
pub const MAX_AUDIT_ERROR_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Ok,
    Error,
}

/// One attempted remote command. Written once, never mutated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub ts: DateTime<Utc>,
    pub cmd: String,
    /// Arguments after the sub-command, redacted.
    pub args: Vec<String>,
    pub status: AuditStatus,
    pub ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    /// Build a record for `args`, redacting with `redactor` and truncating
    /// `error`.
    #[must_use]
    pub fn new(
        redactor: &Redactor,
        args: &[String],
        status: AuditStatus,
        elapsed: Duration,
        error: Option<&str>,
    ) -> Self {
        let (cmd, rest) = match args.split_first() {
            Some((cmd, rest)) => (cmd.clone(), rest),
            None => ("unknown".to_string(), args),
        };
        Self {
            ts: Utc::now(),
            cmd,
            args: redactor.redact_arguments(rest),
            status,
            ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            error: error
                .filter(|e| !e.is_empty())
                .map(|e| e.chars().take(MAX_AUDIT_ERROR_CHARS).collect()),
        }
    }
}
