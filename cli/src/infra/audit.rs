//! Audit log: one redacted JSON record per attempted remote command.

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::AuditSink;
use crate::domain::{AuditEntry, AuditStatus, DokkuError, Redactor};

/// `tracing` target carrying audit records.
pub const AUDIT_TARGET: &str = "dockyard_audit";

/// Production sink: each entry becomes one JSON line at `INFO` on
/// [`AUDIT_TARGET`].
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) {
        match serde_json::to_string(entry) {
            Ok(line) => tracing::info!(target: AUDIT_TARGET, "{line}"),
            Err(err) => tracing::warn!(cmd = %entry.cmd, error = %err, "audit entry not serializable"),
        }
    }
}

/// Builds audit entries and hands them to a sink.
#[derive(Clone)]
pub struct AuditLog {
    redactor: Redactor,
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    #[must_use]
    pub fn new(redactor: Redactor, sink: Arc<dyn AuditSink>) -> Self {
        Self { redactor, sink }
    }

    /// Default redaction, records emitted through `tracing`.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(Redactor::default(), Arc::new(TracingAuditSink))
    }

    pub fn ok(&self, args: &[String], elapsed: Duration) {
        let entry = AuditEntry::new(&self.redactor, args, AuditStatus::Ok, elapsed, None);
        self.sink.record(&entry);
    }

    pub fn error(&self, args: &[String], elapsed: Duration, message: &str) {
        let entry = AuditEntry::new(
            &self.redactor,
            args,
            AuditStatus::Error,
            elapsed,
            Some(message),
        );
        self.sink.record(&entry);
    }

    /// Record the outcome of a finished attempt.
    pub fn outcome<T>(&self, args: &[String], elapsed: Duration, result: &Result<T, DokkuError>) {
        match result {
            Ok(_) => self.ok(args, elapsed),
            Err(err) => self.error(args, elapsed, &err.to_string()),
        }
    }
}
