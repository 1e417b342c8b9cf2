//! Outbound transport sessions.
//!
//! A session accepts already-encoded frame bytes and reports whether they
//! were handed to the operating system. [`StreamSession`] writes to a TCP
//! connection (or any [`tokio::io::AsyncWrite`] in tests), [`DatagramSession`]
//! sends one UDP datagram per call, and [`MixedSession`] alternates between a
//! stream and a datagram sink. The reconnecting wrapper lives in
//! [`crate::supervisor`].

use std::{future::Future, io, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

pub mod datagram;
pub mod mixed;
pub mod stream;

pub use datagram::DatagramSession;
pub use mixed::MixedSession;
pub use stream::StreamSession;

/// Default timeout applied to each write.
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for establishing a TCP connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised by transport sessions.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Target address.
        addr: SocketAddr,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Write or send failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Operation timed out.
    #[error("I/O timeout")]
    Timeout,
    /// The session was closed by an earlier failure or by the caller.
    #[error("session closed")]
    Closed,
    /// Datagram larger than a single UDP packet can carry.
    #[error("datagram of {0} bytes exceeds the UDP payload limit")]
    DatagramTooLarge(usize),
    /// Split point outside the buffer interior.
    #[error("split point {cut} must lie strictly inside a {len}-byte buffer")]
    InvalidSplit {
        /// Requested cut.
        cut: usize,
        /// Buffer length.
        len: usize,
    },
}

/// Which wire a sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Ordered byte stream (TCP).
    Stream,
    /// One frame per datagram (UDP).
    Datagram,
    /// Alternating stream and datagram sends.
    Mixed,
}

/// Destination for encoded frame bytes.
#[async_trait]
pub trait FrameSink: Send {
    /// Submit `bytes` as one write (stream) or one datagram.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the bytes could not be submitted.
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Submit `bytes` as two consecutive writes split at `cut`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidSplit`] unless `0 < cut < len`, or any
    /// error from either write.
    async fn send_split(&mut self, bytes: &[u8], cut: usize) -> Result<(), TransportError> {
        let (head, tail) = split_at_cut(bytes, cut)?;
        self.send(head).await?;
        self.send(tail).await
    }

    /// Release the underlying connection. Further sends fail.
    async fn close(&mut self) {}

    /// Whether a later `send` can still succeed.
    fn is_open(&self) -> bool;

    /// The wire this sink writes to.
    fn kind(&self) -> TransportKind;
}

/// Split `bytes` at `cut`, requiring both halves to be non-empty.
///
/// # Errors
/// Returns [`TransportError::InvalidSplit`] unless `0 < cut < bytes.len()`.
pub fn split_at_cut(bytes: &[u8], cut: usize) -> Result<(&[u8], &[u8]), TransportError> {
    let invalid = || TransportError::InvalidSplit {
        cut,
        len: bytes.len(),
    };
    if cut == 0 {
        return Err(invalid());
    }
    bytes
        .split_at_checked(cut)
        .filter(|(_, tail)| !tail.is_empty())
        .ok_or_else(invalid)
}

pub(crate) async fn io_with_timeout<F, T>(
    timeout_dur: Duration,
    operation: F,
) -> Result<T, TransportError>
where
    F: Future<Output = io::Result<T>>,
{
    timeout(timeout_dur, operation)
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(Into::into)
}
