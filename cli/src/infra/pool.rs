//! Session manager for the one persistent SSH session.
//!
//! Callers that arrive while a connection attempt is in flight queue as
//! waiters instead of starting a second attempt; the queue is drained in one
//! step when the attempt settles. Every transition triggered by a transport
//! event is guarded by the attempt's generation, so a late close from a
//! session that has already been replaced cannot disturb the current one.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::application::ports::{Keepalive, SshConnector, SshTransport};
use crate::domain::{DokkuError, DokkuResult};

/// Lifecycle of the shared session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
    /// The last attempt failed; held only while its waiters are rejected.
    Failed,
}

/// A ready session handed to one caller, tagged with the attempt that
/// produced it.
pub struct Lease<T> {
    pub generation: u64,
    pub transport: Arc<T>,
}

impl<T> Clone for Lease<T> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            transport: Arc::clone(&self.transport),
        }
    }
}

type Waiter<T> = oneshot::Sender<DokkuResult<Lease<T>>>;

struct Inner<T> {
    state: SessionState,
    generation: u64,
    transport: Option<Arc<T>>,
    waiters: Vec<Waiter<T>>,
}

/// Owns the shared session. Cheap to clone; clones share state.
pub struct SessionPool<C: SshConnector> {
    connector: Arc<C>,
    inner: Arc<Mutex<Inner<C::Transport>>>,
}

impl<C: SshConnector> Clone for SessionPool<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: SshConnector> SessionPool<C> {
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Disconnected,
                generation: 0,
                transport: None,
                waiters: Vec::new(),
            })),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Generation of the most recent connection attempt.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Ready session, retrying once if the first attempt fails.
    ///
    /// # Errors
    ///
    /// Returns the second attempt's `Connection` error.
    pub async fn acquire(&self) -> DokkuResult<Lease<C::Transport>> {
        match self.connect_or_wait().await {
            Ok(lease) => Ok(lease),
            Err(err) => {
                debug!(error = %err, "session acquisition failed, retrying once");
                self.connect_or_wait().await
            }
        }
    }

    /// Return the ready session, join the in-flight attempt, or start one.
    ///
    /// # Errors
    ///
    /// Returns the attempt's `Connection` error, shared by every waiter.
    pub async fn connect_or_wait(&self) -> DokkuResult<Lease<C::Transport>> {
        let rx = {
            let mut inner = self.lock();

            if inner.state == SessionState::Ready {
                match inner.transport.as_ref() {
                    Some(transport) if !transport.is_closed() => {
                        return Ok(Lease {
                            generation: inner.generation,
                            transport: Arc::clone(transport),
                        });
                    }
                    _ => {
                        warn!(
                            generation = inner.generation,
                            "SSH session closed, reconnecting"
                        );
                        inner.state = SessionState::Disconnected;
                        inner.transport = None;
                    }
                }
            }

            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);

            if inner.state != SessionState::Connecting {
                inner.generation += 1;
                inner.state = SessionState::Connecting;
                let generation = inner.generation;
                debug!(generation, "opening SSH session");
                self.spawn_connect(generation);
            }
            rx
        };

        rx.await.unwrap_or_else(|_| {
            Err(DokkuError::Connection(
                "connection attempt abandoned".to_string(),
            ))
        })
    }

    fn spawn_connect(&self, generation: u64) {
        let pool = self.clone();
        tokio::spawn(async move {
            let result = pool.connector.connect(Keepalive::shared()).await;
            pool.settle(generation, result);
        });
    }

    fn settle(&self, generation: u64, result: DokkuResult<C::Transport>) {
        match result {
            Ok(transport) => self.on_connected(generation, Arc::new(transport)),
            Err(err) => self.on_failed(generation, &err),
        }
    }

    fn on_connected(&self, generation: u64, transport: Arc<C::Transport>) {
        let waiters = {
            let mut inner = self.lock();
            if inner.generation != generation || inner.state != SessionState::Connecting {
                drop(inner);
                debug!(generation, "discarding superseded SSH session");
                transport.close();
                return;
            }
            inner.state = SessionState::Ready;
            inner.transport = Some(Arc::clone(&transport));
            std::mem::take(&mut inner.waiters)
        };

        debug!(generation, waiters = waiters.len(), "SSH session ready");
        for waiter in waiters {
            let _ = waiter.send(Ok(Lease {
                generation,
                transport: Arc::clone(&transport),
            }));
        }
        self.spawn_close_watcher(generation, transport);
    }

    fn on_failed(&self, generation: u64, err: &DokkuError) {
        let waiters = {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            inner.state = SessionState::Failed;
            inner.transport = None;
            std::mem::take(&mut inner.waiters)
        };

        warn!(generation, error = %err, waiters = waiters.len(), "SSH connection failed");
        for waiter in waiters {
            let _ = waiter.send(Err(err.clone()));
        }

        let mut inner = self.lock();
        if inner.generation == generation && inner.state == SessionState::Failed {
            inner.state = SessionState::Disconnected;
        }
    }

    fn spawn_close_watcher(&self, generation: u64, transport: Arc<C::Transport>) {
        let pool = self.clone();
        tokio::spawn(async move {
            transport.closed().await;
            pool.notify_closed(generation);
        });
    }

    /// The transport of `generation` closed or errored.
    pub fn notify_closed(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.state == SessionState::Ready && inner.generation == generation {
            warn!(generation, "SSH session closed by remote");
            inner.state = SessionState::Disconnected;
            inner.transport = None;
        } else {
            debug!(
                generation,
                current = inner.generation,
                "ignoring close of stale SSH session"
            );
        }
    }

    /// Force the session of `generation` closed so the next acquisition
    /// reconnects. No-op when a newer session is active.
    pub fn invalidate(&self, generation: u64) {
        let stale = {
            let mut inner = self.lock();
            if inner.state == SessionState::Ready && inner.generation == generation {
                inner.state = SessionState::Disconnected;
                inner.transport.take()
            } else {
                None
            }
        };
        if let Some(transport) = stale {
            warn!(generation, "invalidating SSH session");
            transport.close();
        }
    }

    /// Open a dedicated session with no keepalive. It is closed when the
    /// returned guard drops.
    ///
    /// # Errors
    ///
    /// Returns `Connection` when connecting fails. Not retried.
    pub async fn oneshot(&self) -> DokkuResult<OneShotSession<C::Transport>> {
        let transport = self.connector.connect(Keepalive::Off).await?;
        Ok(OneShotSession { transport })
    }

    /// Close the shared session, if any.
    pub fn shutdown(&self) {
        let transport = {
            let mut inner = self.lock();
            inner.state = SessionState::Disconnected;
            inner.transport.take()
        };
        if let Some(transport) = transport {
            transport.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<C::Transport>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A dedicated session, closed unconditionally on drop.
pub struct OneShotSession<T: SshTransport> {
    transport: T,
}

impl<T: SshTransport> Deref for OneShotSession<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T: SshTransport> Drop for OneShotSession<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
