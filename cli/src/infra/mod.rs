//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: the SSH transport, the
//! session pool, command execution, the audit sink, settings loading and the
//! in-memory backend.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod audit;
pub mod config;
pub mod executor;
pub mod memory;
pub mod pool;
pub mod ssh;

pub use audit::{AUDIT_TARGET, AuditLog, TracingAuditSink};
pub use executor::SshExecutor;
pub use memory::InMemoryDokku;
pub use pool::{Lease, OneShotSession, SessionPool, SessionState};
pub use ssh::{Ssh2Connector, Ssh2Transport, SshSettings};
