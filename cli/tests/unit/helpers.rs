//! Shared test fakes: a scripted SSH connector, a recording executor and a
//! collecting audit sink.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dockyard_cli::application::{
    AuditSink, ChannelEvent, ChunkSink, CloseSink, ExecChannel, Keepalive, RemoteExecutor,
    SshConnector, SshTransport, StreamHandle,
};
use dockyard_cli::domain::{AuditEntry, CommandAllowlist, DokkuError, DokkuResult, Redactor};
use dockyard_cli::infra::{AuditLog, SessionPool, SshExecutor};
use tokio::sync::{mpsc, watch};

pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

// ── Fake transport ───────────────────────────────────────────────────────────

/// What every channel opened by a [`FakeConnector`] does.
#[derive(Clone, Default)]
pub struct Script {
    /// Events delivered in order after the command starts.
    pub events: Vec<ChannelEvent>,
    /// Keep the channel open after the scripted events.
    pub hang: bool,
    /// `exec` itself fails, as if the channel could not be opened.
    pub exec_fails: bool,
}

impl Script {
    pub fn exits(code: i32, stdout: &str, stderr: &str) -> Self {
        let mut events = Vec::new();
        if !stdout.is_empty() {
            events.push(ChannelEvent::Stdout(stdout.as_bytes().to_vec()));
        }
        if !stderr.is_empty() {
            events.push(ChannelEvent::Stderr(stderr.as_bytes().to_vec()));
        }
        events.push(ChannelEvent::Exit(code));
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn hanging(events: Vec<ChannelEvent>) -> Self {
        Self {
            events,
            hang: true,
            exec_fails: false,
        }
    }
}

/// Counters shared by a connector and every transport it opened.
#[derive(Default)]
pub struct Probe {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub keepalives: Mutex<Vec<Keepalive>>,
    /// `(command line, stdin)` per exec, in order.
    pub execs: Mutex<Vec<(String, Option<String>)>>,
}

impl Probe {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn execs(&self) -> Vec<(String, Option<String>)> {
        self.execs.lock().unwrap().clone()
    }
}

pub struct FakeTransport {
    probe: Arc<Probe>,
    script: Script,
    closed: watch::Sender<bool>,
    open_channels: Mutex<Vec<mpsc::Sender<ChannelEvent>>>,
}

impl SshTransport for FakeTransport {
    async fn exec(&self, command: &str, stdin: Option<Vec<u8>>) -> DokkuResult<ExecChannel> {
        let stdin = stdin.map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
        self.probe
            .execs
            .lock()
            .unwrap()
            .push((command.to_string(), stdin));
        if self.script.exec_fails || self.is_closed() {
            return Err(DokkuError::Connection("channel open failed".into()));
        }
        let (tx, rx) = mpsc::channel(64);
        for event in &self.script.events {
            tx.try_send(event.clone()).unwrap();
        }
        if self.script.hang {
            self.open_channels.lock().unwrap().push(tx);
        }
        Ok(ExecChannel::new(rx))
    }

    fn close(&self) {
        if !self.closed.send_replace(true) {
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
            self.open_channels.lock().unwrap().clear();
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn closed(&self) -> impl std::future::Future<Output = ()> + Send {
        let mut rx = self.closed.subscribe();
        async move {
            let _ = rx.wait_for(|closed| *closed).await;
        }
    }
}

/// Connector whose sessions follow a [`Script`].
pub struct FakeConnector {
    pub probe: Arc<Probe>,
    script: Script,
    fail: AtomicBool,
    delay: Duration,
}

impl FakeConnector {
    pub fn new(script: Script) -> Self {
        Self {
            probe: Arc::new(Probe::default()),
            script,
            fail: AtomicBool::new(false),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        let connector = Self::new(Script::default());
        connector.fail.store(true, Ordering::SeqCst);
        connector
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl SshConnector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, keepalive: Keepalive) -> DokkuResult<FakeTransport> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        self.probe.keepalives.lock().unwrap().push(keepalive);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DokkuError::Connection("connection refused".into()));
        }
        Ok(FakeTransport {
            probe: Arc::clone(&self.probe),
            script: self.script.clone(),
            closed: watch::channel(false).0,
            open_channels: Mutex::new(Vec::new()),
        })
    }
}

// ── Audit ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingAudit(Mutex<Vec<AuditEntry>>);

impl RecordingAudit {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.0.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record(&self, entry: &AuditEntry) {
        self.0.lock().unwrap().push(entry.clone());
    }
}

/// An executor over `connector` with a recording audit sink.
pub fn executor(
    connector: FakeConnector,
    timeout: Duration,
) -> (SshExecutor<FakeConnector>, Arc<Probe>, Arc<RecordingAudit>) {
    let probe = Arc::clone(&connector.probe);
    let audit = Arc::new(RecordingAudit::default());
    let executor = SshExecutor::new(
        SessionPool::new(connector),
        Arc::new(CommandAllowlist::dokku()),
        AuditLog::new(Redactor::default(), audit.clone()),
        timeout,
    );
    (executor, probe, audit)
}

// ── Fake executor ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub oneshot: bool,
}

/// Records every call and answers from canned replies keyed by sub-command.
#[derive(Default)]
pub struct FakeExecutor {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<HashMap<String, DokkuResult<String>>>,
}

impl FakeExecutor {
    pub fn reply(self, command: &str, reply: DokkuResult<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), reply);
        self
    }

    pub fn ok(self, command: &str, stdout: &str) -> Self {
        self.reply(command, Ok(stdout.to_string()))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|call| call.args[0].clone())
            .collect()
    }

    fn answer(&self, args: &[String], stdin: Option<&str>, oneshot: bool) -> DokkuResult<String> {
        self.calls.lock().unwrap().push(Call {
            args: args.to_vec(),
            stdin: stdin.map(str::to_string),
            oneshot,
        });
        self.replies
            .lock()
            .unwrap()
            .get(&args[0])
            .cloned()
            .unwrap_or_else(|| {
                Err(DokkuError::Connection(format!(
                    "{} not expected in this test",
                    args[0]
                )))
            })
    }
}

impl RemoteExecutor for FakeExecutor {
    async fn exec(&self, args: &[String]) -> DokkuResult<String> {
        self.answer(args, None, false)
    }

    async fn exec_with_stdin(&self, args: &[String], stdin: &str) -> DokkuResult<String> {
        self.answer(args, Some(stdin), false)
    }

    async fn exec_oneshot_with_stdin(&self, args: &[String], stdin: &str) -> DokkuResult<String> {
        self.answer(args, Some(stdin), true)
    }

    fn stream(
        &self,
        args: &[String],
        _on_chunk: ChunkSink,
        _on_close: CloseSink,
    ) -> DokkuResult<StreamHandle> {
        self.calls.lock().unwrap().push(Call {
            args: args.to_vec(),
            stdin: None,
            oneshot: true,
        });
        Ok(StreamHandle::new().0)
    }
}
