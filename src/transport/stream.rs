//! Stream (TCP) session.

use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

use super::{FrameSink, IO_TIMEOUT, TransportError, TransportKind, io_with_timeout, split_at_cut};

/// One outbound byte stream.
///
/// Writes are issued in call order. The first failed write drops the
/// underlying writer, after which every call returns
/// [`TransportError::Closed`].
#[derive(Debug)]
pub struct StreamSession<W = TcpStream> {
    writer: Option<W>,
    peer: Option<SocketAddr>,
    timeout: Duration,
}

impl StreamSession<TcpStream> {
    /// Connect to `addr`, giving up after `connect_timeout`.
    ///
    /// # Errors
    /// Returns [`TransportError::Connect`] when the connection is refused or
    /// does not complete in time.
    pub async fn connect(addr: SocketAddr, connect_timeout: Duration) -> Result<Self, TransportError> {
        let stream = match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(TransportError::Connect { addr, source }),
            Err(_) => {
                return Err(TransportError::Connect {
                    addr,
                    source: std::io::ErrorKind::TimedOut.into(),
                });
            }
        };
        stream.set_nodelay(true)?;
        debug!(peer = %addr, "stream session connected");
        Ok(Self {
            writer: Some(stream),
            peer: Some(addr),
            timeout: IO_TIMEOUT,
        })
    }
}

impl<W> StreamSession<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap an already-connected writer.
    #[must_use]
    #[expect(
        clippy::missing_const_for_fn,
        reason = "const fn with non-const trait bounds (AsyncWrite + Unpin) is misleading"
    )]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            peer: None,
            timeout: IO_TIMEOUT,
        }
    }

    /// Override the per-write timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Remote address, when connected over TCP.
    #[must_use]
    pub const fn peer(&self) -> Option<SocketAddr> { self.peer }

    /// Whether the writer is still usable.
    #[must_use]
    pub const fn is_open(&self) -> bool { self.writer.is_some() }

    /// Write and flush `bytes`. Any sub-slice of a frame is valid input.
    ///
    /// # Errors
    /// Returns [`TransportError::Closed`] after an earlier failure, or the
    /// I/O or timeout error that closed the session.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;
        let result = write_flush(writer, bytes, self.timeout).await;
        if let Err(err) = &result {
            debug!(peer = ?self.peer, error = %err, "stream write failed; closing session");
            self.writer = None;
        }
        result
    }

    /// Write `bytes` as two writes split at `cut`.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidSplit`] unless `0 < cut < len`, or the
    /// error from either write.
    pub async fn write_split(&mut self, bytes: &[u8], cut: usize) -> Result<(), TransportError> {
        let (head, tail) = split_at_cut(bytes, cut)?;
        self.write(head).await?;
        self.write(tail).await
    }

    /// Shut down the write half and release the writer.
    pub async fn close(&mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        if let Err(err) = writer.shutdown().await {
            debug!(peer = ?self.peer, error = %err, "stream shutdown failed");
        }
    }
}

async fn write_flush<W>(writer: &mut W, bytes: &[u8], timeout_dur: Duration) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    io_with_timeout(timeout_dur, writer.write_all(bytes)).await?;
    io_with_timeout(timeout_dur, writer.flush()).await
}

#[async_trait]
impl<W> FrameSink for StreamSession<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> { self.write(bytes).await }

    async fn send_split(&mut self, bytes: &[u8], cut: usize) -> Result<(), TransportError> {
        self.write_split(bytes, cut).await
    }

    async fn close(&mut self) { Self::close(self).await; }

    fn is_open(&self) -> bool { Self::is_open(self) }

    fn kind(&self) -> TransportKind { TransportKind::Stream }
}
