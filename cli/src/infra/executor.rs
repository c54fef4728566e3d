//! Remote command execution over the session pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::application::ports::{
    ChannelEvent, ChunkSink, CloseSink, ExecChannel, RemoteExecutor, SshConnector, SshTransport,
    StreamHandle, wait_cancelled,
};
use crate::domain::{CommandAllowlist, DokkuError, DokkuResult, PreparedCommand};
use crate::infra::audit::AuditLog;
use crate::infra::pool::{OneShotSession, SessionPool};

/// Where a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Shared,
    OneShot,
}

/// [`RemoteExecutor`] backed by a [`SessionPool`].
pub struct SshExecutor<C: SshConnector> {
    pool: SessionPool<C>,
    allowlist: Arc<CommandAllowlist>,
    audit: AuditLog,
    timeout: Duration,
}

impl<C: SshConnector> SshExecutor<C> {
    #[must_use]
    pub fn new(
        pool: SessionPool<C>,
        allowlist: Arc<CommandAllowlist>,
        audit: AuditLog,
        timeout: Duration,
    ) -> Self {
        Self {
            pool,
            allowlist,
            audit,
            timeout,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &SessionPool<C> {
        &self.pool
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn prepare(&self, args: &[String]) -> DokkuResult<PreparedCommand> {
        self.allowlist.prepare(args).inspect_err(|err| {
            warn!(error = %err, "refusing to run command");
        })
    }

    async fn run(&self, args: &[String], stdin: Option<&str>, mode: Mode) -> DokkuResult<String> {
        let command = self.prepare(args)?;
        let started = Instant::now();
        let stdin = stdin.map(|s| s.as_bytes().to_vec());

        let result = tokio::select! {
            result = self.attempt(&command, stdin, mode) => result,
            () = tokio::time::sleep(self.timeout) => Err(DokkuError::CommandTimeout {
                command: command.name().to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        self.audit.outcome(args, started.elapsed(), &result);
        result
    }

    async fn attempt(
        &self,
        command: &PreparedCommand,
        stdin: Option<Vec<u8>>,
        mode: Mode,
    ) -> DokkuResult<String> {
        match mode {
            Mode::Shared => {
                let lease = self.pool.acquire().await?;
                let channel = match lease.transport.exec(command.rendered(), stdin).await {
                    Ok(channel) => channel,
                    Err(err) => {
                        self.pool.invalidate(lease.generation);
                        return Err(DokkuError::Connection(connection_message(err)));
                    }
                };
                collect(command, channel).await
            }
            Mode::OneShot => {
                let session = self.pool.oneshot().await?;
                let channel = session
                    .exec(command.rendered(), stdin)
                    .await
                    .map_err(|err| DokkuError::Connection(connection_message(err)))?;
                let output = collect(command, channel).await;
                drop(session);
                output
            }
        }
    }
}

fn connection_message(err: DokkuError) -> String {
    match err {
        DokkuError::Connection(message) => message,
        other => other.to_string(),
    }
}

/// Drain a channel into the command's result.
async fn collect(command: &PreparedCommand, mut channel: ExecChannel) -> DokkuResult<String> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    loop {
        match channel.next().await {
            Some(ChannelEvent::Stdout(bytes)) => stdout.extend_from_slice(&bytes),
            Some(ChannelEvent::Stderr(bytes)) => stderr.extend_from_slice(&bytes),
            Some(ChannelEvent::Exit(0)) => {
                return Ok(String::from_utf8_lossy(&stdout).into_owned());
            }
            Some(ChannelEvent::Exit(code)) => {
                let output = if stderr.is_empty() { stdout } else { stderr };
                return Err(DokkuError::RemoteExit {
                    command: command.name().to_string(),
                    code,
                    output: String::from_utf8_lossy(&output).into_owned(),
                });
            }
            Some(ChannelEvent::Failed(message)) => return Err(DokkuError::Connection(message)),
            None => {
                return Err(DokkuError::Connection(format!(
                    "channel closed before {} exited",
                    command.name()
                )));
            }
        }
    }
}

impl<C: SshConnector> RemoteExecutor for SshExecutor<C> {
    async fn exec(&self, args: &[String]) -> DokkuResult<String> {
        self.run(args, None, Mode::Shared).await
    }

    async fn exec_with_stdin(&self, args: &[String], stdin: &str) -> DokkuResult<String> {
        self.run(args, Some(stdin), Mode::Shared).await
    }

    async fn exec_oneshot_with_stdin(&self, args: &[String], stdin: &str) -> DokkuResult<String> {
        self.run(args, Some(stdin), Mode::OneShot).await
    }

    fn stream(
        &self,
        args: &[String],
        on_chunk: ChunkSink,
        on_close: CloseSink,
    ) -> DokkuResult<StreamHandle> {
        let command = self.prepare(args)?;
        let (handle, cancelled) = StreamHandle::new();
        let pool = self.pool.clone();
        let audit = self.audit.clone();
        let args = args.to_vec();
        let name = command.name().to_string();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = wait_cancelled(cancelled) => {
                    debug!(cmd = %name, "stream cancelled");
                }
                () = pump_stream(pool, audit, args, command, on_chunk, on_close) => {}
            }
        });

        Ok(handle)
    }
}

async fn pump_stream<C: SshConnector>(
    pool: SessionPool<C>,
    audit: AuditLog,
    args: Vec<String>,
    command: PreparedCommand,
    mut on_chunk: ChunkSink,
    on_close: CloseSink,
) {
    let started = Instant::now();
    let opened = open_stream(&pool, &command).await;
    audit.outcome(&args, started.elapsed(), &opened);

    let (_session, mut channel) = match opened {
        Ok(opened) => opened,
        Err(err) => {
            warn!(cmd = %command.name(), error = %err, "stream failed to start");
            on_close(1);
            return;
        }
    };

    let code = loop {
        match channel.next().await {
            Some(ChannelEvent::Stdout(bytes) | ChannelEvent::Stderr(bytes)) => {
                on_chunk(String::from_utf8_lossy(&bytes).into_owned());
            }
            Some(ChannelEvent::Exit(code)) => break code,
            Some(ChannelEvent::Failed(message)) => {
                warn!(cmd = %command.name(), error = %message, "stream broke");
                break 1;
            }
            None => break 1,
        }
    };
    on_close(code);
}

async fn open_stream<C: SshConnector>(
    pool: &SessionPool<C>,
    command: &PreparedCommand,
) -> DokkuResult<(OneShotSession<C::Transport>, ExecChannel)> {
    let session = pool.oneshot().await?;
    let channel = session
        .exec(command.rendered(), None)
        .await
        .map_err(|err| DokkuError::Connection(connection_message(err)))?;
    Ok((session, channel))
}
