//! In-memory sinks shared by unit and integration tests.

use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;

use crate::transport::{FrameSink, TransportError, TransportKind};

/// Shared record of every successful write.
pub type WriteLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// Sink that records writes and can be told to fail.
///
/// A stream-kind sink closes on its first failure; a datagram-kind sink
/// stays open and keeps failing only for the write that hit the limit.
#[derive(Debug, Clone)]
pub struct RecordingSink {
    kind: TransportKind,
    log: WriteLog,
    fail_after: Option<usize>,
    attempts: usize,
    open: bool,
}

impl RecordingSink {
    fn with_kind(kind: TransportKind) -> Self {
        Self {
            kind,
            log: Arc::default(),
            fail_after: None,
            attempts: 0,
            open: true,
        }
    }

    /// A sink that behaves like a stream session.
    #[must_use]
    pub fn stream() -> Self { Self::with_kind(TransportKind::Stream) }

    /// A sink that behaves like a datagram session.
    #[must_use]
    pub fn datagram() -> Self { Self::with_kind(TransportKind::Datagram) }

    /// Fail the write that follows `successes` successful writes.
    #[must_use]
    pub const fn fail_after(mut self, successes: usize) -> Self {
        self.fail_after = Some(successes);
        self
    }

    /// Record writes into an existing log.
    #[must_use]
    pub fn with_log(mut self, log: WriteLog) -> Self {
        self.log = log;
        self
    }

    /// Handle to the write log.
    #[must_use]
    pub fn log(&self) -> WriteLog { Arc::clone(&self.log) }

    /// Copy of every successful write so far.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Concatenation of every successful write.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> { self.writes().concat() }

    /// Number of `send` calls, successful or not.
    #[must_use]
    pub const fn attempts(&self) -> usize { self.attempts }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let index = self.attempts;
        self.attempts += 1;
        if self.fail_after == Some(index) {
            if self.kind != TransportKind::Datagram {
                self.open = false;
            }
            return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
        }
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bytes.to_vec());
        Ok(())
    }

    async fn close(&mut self) { self.open = false; }

    fn is_open(&self) -> bool { self.open }

    fn kind(&self) -> TransportKind { self.kind }
}
