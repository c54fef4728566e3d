//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` and never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;

pub use ports::{
    AuditSink, ChannelEvent, ChunkSink, CloseSink, DokkuApi, ExecChannel, Keepalive,
    RemoteExecutor, ResourceLimits, SshConnector, SshTransport, StreamHandle, wait_cancelled,
};
