//! Alternating stream/datagram sink.

use async_trait::async_trait;

use super::{FrameSink, TransportError, TransportKind};

/// Sends even-numbered frames over the stream sink and odd-numbered frames
/// over the datagram sink. Split writes always use the stream.
#[derive(Debug)]
pub struct MixedSession<S, D> {
    stream: S,
    datagram: D,
    sends: u64,
}

impl<S, D> MixedSession<S, D>
where
    S: FrameSink,
    D: FrameSink,
{
    /// Pair a stream sink with a datagram sink.
    #[must_use]
    pub const fn new(stream: S, datagram: D) -> Self {
        Self {
            stream,
            datagram,
            sends: 0,
        }
    }

    /// Number of `send` calls routed so far.
    #[must_use]
    pub const fn sends(&self) -> u64 { self.sends }
}

#[async_trait]
impl<S, D> FrameSink for MixedSession<S, D>
where
    S: FrameSink,
    D: FrameSink,
{
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let use_stream = self.sends & 1 == 0;
        self.sends += 1;
        if use_stream {
            self.stream.send(bytes).await
        } else {
            self.datagram.send(bytes).await
        }
    }

    async fn send_split(&mut self, bytes: &[u8], cut: usize) -> Result<(), TransportError> {
        self.stream.send_split(bytes, cut).await
    }

    async fn close(&mut self) {
        self.stream.close().await;
        self.datagram.close().await;
    }

    fn is_open(&self) -> bool { self.stream.is_open() && self.datagram.is_open() }

    fn kind(&self) -> TransportKind { TransportKind::Mixed }
}
