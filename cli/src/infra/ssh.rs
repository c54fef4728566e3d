//! `ssh2`-backed transport.
//!
//! Handshake and authentication run on a blocking thread. Afterwards the
//! session is switched to non-blocking mode and each channel is pumped by
//! its own blocking task, so several commands share one session.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use ssh2::{Channel, ErrorCode, Session};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::application::ports::{ChannelEvent, ExecChannel, Keepalive, SshConnector, SshTransport};
use crate::domain::{DokkuError, DokkuResult};

/// `LIBSSH2_ERROR_EAGAIN`.
const EAGAIN: i32 = -37;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_BUFFER: usize = 8192;
const EVENT_BUFFER: usize = 64;

/// Connection parameters for the Dokku host.
#[derive(Clone)]
pub struct SshSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// PEM-encoded private key.
    pub private_key_pem: String,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for SshSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("private_key_pem", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Opens `ssh2` sessions with public-key authentication.
pub struct Ssh2Connector {
    settings: Arc<SshSettings>,
}

impl Ssh2Connector {
    #[must_use]
    pub fn new(settings: SshSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl SshConnector for Ssh2Connector {
    type Transport = Ssh2Transport;

    fn connect(
        &self,
        keepalive: Keepalive,
    ) -> impl Future<Output = DokkuResult<Ssh2Transport>> + Send {
        let settings = Arc::clone(&self.settings);
        async move {
            let session = tokio::task::spawn_blocking(move || open_session(&settings, keepalive))
                .await
                .map_err(|err| DokkuError::Connection(format!("connect task failed: {err}")))??;
            Ok(Ssh2Transport::start(session, keepalive))
        }
    }
}

fn connection_error(context: &str, err: impl std::fmt::Display) -> DokkuError {
    DokkuError::Connection(format!("{context}: {err}"))
}

fn open_session(settings: &SshSettings, keepalive: Keepalive) -> DokkuResult<Session> {
    let addrs = (settings.host.as_str(), settings.port)
        .to_socket_addrs()
        .map_err(|err| connection_error(&format!("cannot resolve {}", settings.host), err))?;

    let mut last_err = None;
    let mut tcp = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, settings.connect_timeout) {
            Ok(stream) => {
                tcp = Some(stream);
                break;
            }
            Err(err) => last_err = Some(err),
        }
    }
    let tcp = tcp.ok_or_else(|| match last_err {
        Some(err) => connection_error(&format!("cannot connect to {}", settings.host), err),
        None => DokkuError::Connection(format!("no address for {}", settings.host)),
    })?;

    let mut session = Session::new().map_err(|err| connection_error("session init", err))?;
    session.set_tcp_stream(tcp);
    session.set_timeout(u32::try_from(settings.connect_timeout.as_millis()).unwrap_or(u32::MAX));
    session
        .handshake()
        .map_err(|err| connection_error("handshake", err))?;
    session
        .userauth_pubkey_memory(&settings.user, None, &settings.private_key_pem, None)
        .map_err(|err| connection_error("authentication", err))?;
    if !session.authenticated() {
        return Err(DokkuError::Connection(format!(
            "authentication rejected for {}",
            settings.user
        )));
    }

    if let Keepalive::Every { interval, .. } = keepalive {
        let secs = u32::try_from(interval.as_secs()).unwrap_or(u32::MAX).max(1);
        session.set_keepalive(true, secs);
    }
    session.set_timeout(0);
    session.set_blocking(false);
    debug!(host = %settings.host, port = settings.port, "SSH session authenticated");
    Ok(session)
}

fn would_block(err: &ssh2::Error) -> bool {
    matches!(err.code(), ErrorCode::Session(EAGAIN))
}

struct Shared {
    session: Session,
    closed: watch::Sender<bool>,
}

impl Shared {
    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    fn close(&self) {
        if !self.closed.send_replace(true) {
            let _ = self.session.disconnect(None, "closing", None);
        }
    }
}

/// One authenticated session. Closed on drop.
pub struct Ssh2Transport {
    shared: Arc<Shared>,
}

impl Ssh2Transport {
    fn start(session: Session, keepalive: Keepalive) -> Self {
        let (closed, _) = watch::channel(false);
        let shared = Arc::new(Shared { session, closed });
        if let Keepalive::Every {
            interval,
            max_missed,
        } = keepalive
        {
            tokio::spawn(keepalive_loop(Arc::clone(&shared), interval, max_missed));
        }
        Self { shared }
    }
}

async fn keepalive_loop(shared: Arc<Shared>, interval: Duration, max_missed: u32) {
    let closed = shared.closed.subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let mut missed = 0u32;

    loop {
        tokio::select! {
            () = wait_closed(closed.clone()) => return,
            _ = ticker.tick() => {}
        }

        let probe = Arc::clone(&shared);
        let sent = tokio::task::spawn_blocking(move || probe.session.keepalive_send()).await;
        match sent {
            Ok(Ok(_)) => missed = 0,
            Ok(Err(err)) if would_block(&err) => {}
            Ok(Err(err)) => {
                missed += 1;
                debug!(missed, error = %err, "keepalive missed");
            }
            Err(_) => missed += 1,
        }

        if missed >= max_missed {
            warn!(missed, "SSH keepalive lost, closing session");
            shared.close();
            return;
        }
    }
}

async fn wait_closed(mut closed: watch::Receiver<bool>) {
    let _ = closed.wait_for(|flag| *flag).await;
}

impl SshTransport for Ssh2Transport {
    fn exec(
        &self,
        command: &str,
        stdin: Option<Vec<u8>>,
    ) -> impl Future<Output = DokkuResult<ExecChannel>> + Send {
        let shared = Arc::clone(&self.shared);
        let command = command.to_string();
        async move {
            if shared.is_closed() {
                return Err(DokkuError::Connection("session closed".to_string()));
            }
            let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
            let (started_tx, started_rx) = oneshot::channel();
            tokio::task::spawn_blocking(move || {
                pump_channel(&shared, &command, stdin, &events_tx, started_tx);
            });
            started_rx
                .await
                .map_err(|_| DokkuError::Connection("channel task ended".to_string()))??;
            Ok(ExecChannel::new(events_rx))
        }
    }

    fn close(&self) {
        self.shared.close();
    }

    fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    fn closed(&self) -> impl Future<Output = ()> + Send {
        wait_closed(self.shared.closed.subscribe())
    }
}

impl Drop for Ssh2Transport {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Retry a non-blocking libssh2 call until it stops returning EAGAIN.
fn retry<T>(shared: &Shared, mut op: impl FnMut() -> Result<T, ssh2::Error>) -> DokkuResult<T> {
    loop {
        if shared.is_closed() {
            return Err(DokkuError::Connection("session closed".to_string()));
        }
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if would_block(&err) => std::thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(DokkuError::Connection(err.to_string())),
        }
    }
}

fn open_channel(shared: &Shared, command: &str, stdin: Option<&[u8]>) -> DokkuResult<Channel> {
    let mut channel = retry(shared, || shared.session.channel_session())?;
    retry(shared, || channel.exec(command))?;

    if let Some(mut input) = stdin {
        while !input.is_empty() {
            if shared.is_closed() {
                return Err(DokkuError::Connection("session closed".to_string()));
            }
            match channel.write(input) {
                Ok(0) => std::thread::sleep(POLL_INTERVAL),
                Ok(n) => input = &input[n..],
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) => return Err(connection_error("stdin write", err)),
            }
        }
        retry(shared, || channel.send_eof())?;
    }
    Ok(channel)
}

enum Pumped {
    Data(usize),
    Idle,
}

fn read_into(stream: &mut impl Read, buf: &mut [u8]) -> std::io::Result<Pumped> {
    match stream.read(buf) {
        Ok(0) => Ok(Pumped::Idle),
        Ok(n) => Ok(Pumped::Data(n)),
        Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(Pumped::Idle),
        Err(err) => Err(err),
    }
}

fn pump_channel(
    shared: &Shared,
    command: &str,
    stdin: Option<Vec<u8>>,
    events: &mpsc::Sender<ChannelEvent>,
    started: oneshot::Sender<DokkuResult<()>>,
) {
    let mut channel = match open_channel(shared, command, stdin.as_deref()) {
        Ok(channel) => {
            let _ = started.send(Ok(()));
            channel
        }
        Err(err) => {
            let _ = started.send(Err(err));
            return;
        }
    };

    let mut stderr = channel.stderr();
    let mut buf = vec![0u8; READ_BUFFER];

    loop {
        if shared.is_closed() {
            let _ = events.blocking_send(ChannelEvent::Failed("session closed".to_string()));
            return;
        }

        let mut progressed = false;
        for is_stderr in [false, true] {
            let read = if is_stderr {
                read_into(&mut stderr, &mut buf)
            } else {
                read_into(&mut channel, &mut buf)
            };
            match read {
                Ok(Pumped::Data(n)) => {
                    progressed = true;
                    let bytes = buf[..n].to_vec();
                    let event = if is_stderr {
                        ChannelEvent::Stderr(bytes)
                    } else {
                        ChannelEvent::Stdout(bytes)
                    };
                    if events.blocking_send(event).is_err() {
                        let _ = channel.close();
                        return;
                    }
                }
                Ok(Pumped::Idle) => {}
                Err(err) => {
                    let _ = events.blocking_send(ChannelEvent::Failed(err.to_string()));
                    return;
                }
            }
        }

        if !progressed {
            if channel.eof() {
                break;
            }
            if events.is_closed() {
                let _ = channel.close();
                return;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    let event = match retry(shared, || channel.wait_close()) {
        Ok(()) => match channel.exit_status() {
            Ok(code) => ChannelEvent::Exit(code),
            Err(err) => ChannelEvent::Failed(err.to_string()),
        },
        Err(err) => ChannelEvent::Failed(err.to_string()),
    };
    let _ = events.blocking_send(event);
}
