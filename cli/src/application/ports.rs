//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dockyard_common::{
    AppInfo, AppMeta, ColumnInfo, DatabaseInfo, GitReport, ProcessScale, QueryResult, ReportField,
    TableInfo,
};
use tokio::sync::{mpsc, watch};

use crate::domain::{AuditEntry, DokkuResult};

// ── Transport Ports ───────────────────────────────────────────────────────────

/// Idle keepalive policy for a new SSH session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keepalive {
    /// Probe every `interval`; declare the session dead after `max_missed`
    /// unanswered probes.
    Every { interval: Duration, max_missed: u32 },
    /// No keepalive (one-shot and streaming sessions).
    Off,
}

impl Keepalive {
    /// The cadence used for the shared session: 15 s, three misses.
    #[must_use]
    pub fn shared() -> Self {
        Self::Every {
            interval: Duration::from_secs(15),
            max_missed: 3,
        }
    }
}

/// One event from a running remote command, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    /// The command finished with this exit code. Always the last event.
    Exit(i32),
    /// The channel broke before an exit code was received.
    Failed(String),
}

/// Receiving end of an open command channel. Dropping it closes the remote
/// channel.
pub struct ExecChannel {
    events: mpsc::Receiver<ChannelEvent>,
}

impl ExecChannel {
    #[must_use]
    pub fn new(events: mpsc::Receiver<ChannelEvent>) -> Self {
        Self { events }
    }

    /// Next event, or `None` once the channel has been torn down.
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        self.events.recv().await
    }
}

/// An authenticated SSH session able to run commands concurrently.
pub trait SshTransport: Send + Sync + 'static {
    /// Open a channel and start `command`. When `stdin` is given it is
    /// written and the input stream closed before any output is awaited.
    fn exec(
        &self,
        command: &str,
        stdin: Option<Vec<u8>>,
    ) -> impl Future<Output = DokkuResult<ExecChannel>> + Send;

    /// Tear the session down. Idempotent.
    fn close(&self);

    /// Whether the session has been closed or declared dead.
    fn is_closed(&self) -> bool;

    /// Resolves once the session is closed, for any reason.
    fn closed(&self) -> impl Future<Output = ()> + Send;
}

/// Opens authenticated sessions to the configured host.
pub trait SshConnector: Send + Sync + 'static {
    type Transport: SshTransport;

    /// Connect and authenticate.
    ///
    /// # Errors
    ///
    /// Returns `Connection` when the TCP connect, handshake or
    /// authentication fails.
    fn connect(
        &self,
        keepalive: Keepalive,
    ) -> impl Future<Output = DokkuResult<Self::Transport>> + Send;
}

// ── Audit Port ────────────────────────────────────────────────────────────────

/// Destination for audit records. Sinks swallow their own failures.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

// ── Streaming ─────────────────────────────────────────────────────────────────

/// Receives each output chunk of a streamed command.
pub type ChunkSink = Box<dyn FnMut(String) + Send>;

/// Receives the exit code when a streamed command ends on its own.
pub type CloseSink = Box<dyn FnOnce(i32) + Send>;

/// Cancellation handle for a streamed command.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl StreamHandle {
    /// A fresh handle plus the receiver the streaming task watches.
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel: Arc::new(tx) }, rx)
    }

    /// Stop delivering chunks and close the stream's transport.
    /// No close callback fires after a cancel.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// Resolves once the paired [`StreamHandle`] is cancelled. Never resolves if
/// every handle is dropped without cancelling.
pub async fn wait_cancelled(mut cancelled: watch::Receiver<bool>) {
    if cancelled.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ── Execution Port ────────────────────────────────────────────────────────────

/// Runs allowlisted commands on the remote host with a timeout and an audit
/// record per attempt.
#[allow(async_fn_in_trait)]
pub trait RemoteExecutor {
    /// Run over the shared session; stdout on exit 0.
    async fn exec(&self, args: &[String]) -> DokkuResult<String>;

    /// Like [`exec`](Self::exec) with `stdin` written then closed.
    async fn exec_with_stdin(&self, args: &[String], stdin: &str) -> DokkuResult<String>;

    /// Like [`exec_with_stdin`](Self::exec_with_stdin) on a dedicated
    /// session that is closed afterwards.
    async fn exec_oneshot_with_stdin(&self, args: &[String], stdin: &str) -> DokkuResult<String>;

    /// Stream both output streams to `on_chunk` on a dedicated session.
    ///
    /// # Errors
    ///
    /// Returns `BlockedCommand` synchronously; transport failures are
    /// reported through `on_close(1)`.
    fn stream(
        &self,
        args: &[String],
        on_chunk: ChunkSink,
        on_close: CloseSink,
    ) -> DokkuResult<StreamHandle>;
}

// ── Domain Client Port ────────────────────────────────────────────────────────

/// Memory/CPU limits for one process type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub process_type: String,
    pub memory: Option<String>,
    pub cpu: Option<String>,
}

/// Dokku administrative verbs. Implemented by the remote client and by the
/// in-memory stand-in; call sites are generic over this trait.
#[allow(async_fn_in_trait)]
pub trait DokkuApi {
    /// Populate the apps cache ahead of first use.
    async fn warmup(&self) -> DokkuResult<()>;

    // Apps
    async fn apps_list(&self) -> DokkuResult<Vec<AppInfo>>;
    async fn app_names(&self) -> DokkuResult<Vec<String>>;
    async fn create_app(&self, app: &str) -> DokkuResult<String>;
    async fn destroy_app(&self, app: &str) -> DokkuResult<String>;
    async fn app_report(&self, app: &str) -> DokkuResult<String>;
    async fn app_meta(&self, app: &str) -> DokkuResult<AppMeta>;
    async fn git_report(&self, app: &str) -> DokkuResult<Option<GitReport>>;

    // Processes
    async fn start_app(&self, app: &str) -> DokkuResult<String>;
    async fn stop_app(&self, app: &str) -> DokkuResult<String>;
    async fn restart_app(&self, app: &str) -> DokkuResult<String>;
    async fn rebuild_app(&self, app: &str) -> DokkuResult<String>;
    async fn scale_report(&self, app: &str) -> DokkuResult<Vec<ProcessScale>>;
    async fn scale(&self, app: &str, counts: &[(String, u32)]) -> DokkuResult<String>;

    // Logs
    async fn logs(&self, app: &str, num: u32) -> DokkuResult<String>;
    fn stream_logs(
        &self,
        app: &str,
        on_chunk: ChunkSink,
        on_close: CloseSink,
    ) -> DokkuResult<StreamHandle>;

    // Config
    async fn config_show(&self, app: &str) -> DokkuResult<BTreeMap<String, String>>;
    async fn config_set(
        &self,
        app: &str,
        vars: &[(String, String)],
        no_restart: bool,
    ) -> DokkuResult<String>;
    async fn config_unset(&self, app: &str, keys: &[String], no_restart: bool)
    -> DokkuResult<String>;

    // Domains and TLS
    async fn domains(&self, app: &str) -> DokkuResult<Vec<String>>;
    async fn add_domain(&self, app: &str, domain: &str) -> DokkuResult<String>;
    async fn remove_domain(&self, app: &str, domain: &str) -> DokkuResult<String>;
    async fn enable_tls(&self, app: &str) -> DokkuResult<String>;
    async fn disable_tls(&self, app: &str) -> DokkuResult<String>;

    // Postgres
    async fn databases(&self) -> DokkuResult<Vec<DatabaseInfo>>;
    async fn create_database(&self, db: &str) -> DokkuResult<String>;
    async fn destroy_database(&self, db: &str) -> DokkuResult<String>;
    async fn database_info(&self, db: &str) -> DokkuResult<Vec<ReportField>>;
    async fn link_database(&self, db: &str, app: &str) -> DokkuResult<String>;
    async fn unlink_database(&self, db: &str, app: &str) -> DokkuResult<String>;

    // Resources
    async fn resource_report(&self, app: &str) -> DokkuResult<Vec<ReportField>>;
    async fn set_resource_limits(&self, app: &str, limits: &ResourceLimits)
    -> DokkuResult<String>;

    // SQL explorer
    async fn run_query(&self, db: &str, sql: &str) -> DokkuResult<QueryResult>;
    async fn tables(&self, db: &str) -> DokkuResult<Vec<TableInfo>>;
    async fn table_schema(&self, db: &str, table: &str) -> DokkuResult<Vec<ColumnInfo>>;
    async fn table_preview(&self, db: &str, table: &str) -> DokkuResult<QueryResult>;
}
