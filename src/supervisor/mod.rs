//! Reconnect-with-backoff wrapper for stream sessions.
//!
//! [`ConnectionSupervisor`] owns a [`Connector`] and at most one live session.
//! Whenever connecting or sending fails it drops the session, waits the fixed
//! [`BackoffPolicy`] interval and tries again, without limit. Nothing is
//! buffered or replayed: a failed send is returned to the caller, which
//! counts it as an error and moves on to the next frame.

#![expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! macro usage"
)]

use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    stop::StopSignal,
    transport::{CONNECT_TIMEOUT, FrameSink, IO_TIMEOUT, StreamSession, TransportError, TransportKind},
};

pub mod state;

pub use state::{ConnectionEvent, ConnectionState};

/// Default wait between reconnect attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Produces fresh stream sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Session type handed out on success.
    type Session: FrameSink;

    /// Open a new session.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the session cannot be established.
    async fn connect(&self) -> Result<Self::Session, TransportError>;
}

/// Connects TCP stream sessions to a fixed address.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    addr: SocketAddr,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl TcpConnector {
    /// Connector using the default connect and write timeouts.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: CONNECT_TIMEOUT,
            io_timeout: IO_TIMEOUT,
        }
    }

    /// Override both timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, connect_timeout: Duration, io_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.io_timeout = io_timeout;
        self
    }

    /// Target address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr { self.addr }
}

#[async_trait]
impl Connector for TcpConnector {
    type Session = StreamSession;

    async fn connect(&self) -> Result<Self::Session, TransportError> {
        let session = StreamSession::connect(self.addr, self.connect_timeout).await?;
        Ok(session.with_timeout(self.io_timeout))
    }
}

/// Fixed-interval retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    interval: Duration,
}

impl BackoffPolicy {
    /// Wait `interval` before every retry.
    #[must_use]
    pub const fn fixed(interval: Duration) -> Self { Self { interval } }

    /// Delay before the next attempt.
    #[must_use]
    pub const fn delay(&self) -> Duration { self.interval }
}

impl Default for BackoffPolicy {
    fn default() -> Self { Self::fixed(DEFAULT_BACKOFF) }
}

/// Stream sink that reconnects after failures.
pub struct ConnectionSupervisor<C: Connector> {
    connector: C,
    backoff: BackoffPolicy,
    state: ConnectionState,
    session: Option<C::Session>,
    stop: StopSignal,
    connects: u64,
    failed_attempts: u64,
}

impl<C: Connector> ConnectionSupervisor<C> {
    /// Supervise sessions produced by `connector`.
    #[must_use]
    pub fn new(connector: C, backoff: BackoffPolicy) -> Self {
        Self {
            connector,
            backoff,
            state: ConnectionState::Disconnected,
            session: None,
            stop: StopSignal::never(),
            connects: 0,
            failed_attempts: 0,
        }
    }

    /// Abort connect loops and backoff waits once `stop` is raised.
    #[must_use]
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState { self.state }

    /// Successful connects, the first included.
    #[must_use]
    pub const fn connects(&self) -> u64 { self.connects }

    /// Successful connects after the first.
    #[must_use]
    pub const fn reconnects(&self) -> u64 { self.connects.saturating_sub(1) }

    /// Connect attempts that failed.
    #[must_use]
    pub const fn failed_attempts(&self) -> u64 { self.failed_attempts }

    /// The wrapped connector.
    #[must_use]
    pub const fn connector(&self) -> &C { &self.connector }

    fn apply(&mut self, event: ConnectionEvent) {
        match self.state.transition(event) {
            Some(next) => self.state = next,
            None => debug!(state = ?self.state, event = ?event, "ignored connection event"),
        }
    }

    /// Wait out the backoff. Returns `false` if the stop signal interrupted it.
    async fn wait_backoff(&mut self) -> bool {
        let delay = self.backoff.delay();
        tokio::select! {
            () = sleep(delay) => true,
            () = self.stop.raised() => false,
        }
    }

    /// Make sure a live session is held, retrying without limit.
    ///
    /// # Errors
    /// Returns [`TransportError::Closed`] only when the stop signal is raised
    /// before a session could be established.
    pub async fn ensure_connected(&mut self) -> Result<(), TransportError> {
        loop {
            if self.session.as_ref().is_some_and(FrameSink::is_open) {
                return Ok(());
            }
            if self.stop.is_raised() {
                return Err(TransportError::Closed);
            }
            if self.state.needs_backoff() {
                if !self.wait_backoff().await {
                    return Err(TransportError::Closed);
                }
                self.apply(ConnectionEvent::BackoffElapsed);
            } else {
                self.apply(ConnectionEvent::ConnectRequested);
            }
            match self.connector.connect().await {
                Ok(session) => {
                    self.apply(ConnectionEvent::ConnectSucceeded);
                    self.connects += 1;
                    if self.connects > 1 {
                        info!(reconnects = self.reconnects(), "stream session re-established");
                    }
                    self.session = Some(session);
                    return Ok(());
                }
                Err(err) => {
                    self.failed_attempts += 1;
                    warn!(
                        error = %err,
                        attempt = self.failed_attempts,
                        backoff = ?self.backoff.delay(),
                        "connect failed; retrying after backoff"
                    );
                    self.apply(ConnectionEvent::ConnectFailed);
                }
            }
        }
    }

    async fn drop_session(&mut self, err: &TransportError) {
        warn!(error = %err, "send failed; dropping session");
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.apply(ConnectionEvent::SendFailed);
    }
}

#[async_trait]
impl<C: Connector> FrameSink for ConnectionSupervisor<C> {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.ensure_connected().await?;
        let Some(session) = self.session.as_mut() else {
            return Err(TransportError::Closed);
        };
        let result = session.send(bytes).await;
        if let Err(err) = &result {
            self.drop_session(err).await;
        }
        result
    }

    async fn send_split(&mut self, bytes: &[u8], cut: usize) -> Result<(), TransportError> {
        self.ensure_connected().await?;
        let Some(session) = self.session.as_mut() else {
            return Err(TransportError::Closed);
        };
        let result = session.send_split(bytes, cut).await;
        match &result {
            Err(TransportError::InvalidSplit { .. }) | Ok(()) => {}
            Err(err) => self.drop_session(err).await,
        }
        result
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.apply(ConnectionEvent::Closed);
    }

    fn is_open(&self) -> bool { !self.stop.is_raised() }

    fn kind(&self) -> TransportKind { TransportKind::Stream }
}
