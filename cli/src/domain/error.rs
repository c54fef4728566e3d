//! Typed domain errors.
//!
//! Every core operation returns [`DokkuResult`]. The CLI converts these into
//! `anyhow::Error` through `?` and maps each kind to a stable JSON code.

use thiserror::Error;

/// Errors produced by the safety layer, the session manager, the execution
/// protocol and the domain client.
///
/// `Clone` so one connection failure can be handed to every queued waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DokkuError {
    #[error("Command not allowed: {0}")]
    BlockedCommand(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("SSH connection failed: {0}")]
    Connection(String),

    #[error("Command timed out after {timeout_ms}ms: {command}")]
    CommandTimeout { command: String, timeout_ms: u64 },

    #[error("Command failed (exit {code}): {command}: {output}")]
    RemoteExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Query failed: {0}")]
    Query(String),
}

impl DokkuError {
    /// Shorthand for a [`DokkuError::Validation`] naming the offending field.
    #[must_use]
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code used by `--json` error objects.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BlockedCommand(_) => "BLOCKED_COMMAND",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Connection(_) => "CONNECTION_ERROR",
            Self::CommandTimeout { .. } => "COMMAND_TIMEOUT",
            Self::RemoteExit { .. } => "REMOTE_EXIT",
            Self::Query(_) => "QUERY_ERROR",
        }
    }
}

/// Result alias for core operations.
pub type DokkuResult<T> = Result<T, DokkuError>;
