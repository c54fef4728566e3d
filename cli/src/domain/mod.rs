//! Domain layer: pure logic: errors, the command safety layer, SQL safety,
//! identifier validation, report parsing and the audit record shape.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod audit;
pub mod error;
pub mod report;
pub mod safety;
pub mod sql;
pub mod validate;

pub use audit::{AuditEntry, AuditStatus};
pub use error::{DokkuError, DokkuResult};
pub use safety::{CommandAllowlist, PreparedCommand, Redactor, escape_argument, terminates_session};
pub use sql::{SqlStatement, validate_sql_statement};
pub use validate::TableName;
