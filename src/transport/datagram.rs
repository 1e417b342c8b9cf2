//! Datagram (UDP) session.

use std::{io, net::SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::{FrameSink, TransportError, TransportKind};
use crate::frame::MAX_DATAGRAM_LEN;

/// Fire-and-forget sender bound to an ephemeral local port.
///
/// Each call sends exactly one datagram to the fixed target. Delivery is not
/// confirmed and failures never close the session.
#[derive(Debug)]
pub struct DatagramSession {
    socket: UdpSocket,
    target: SocketAddr,
}

impl DatagramSession {
    /// Bind an ephemeral socket of the same address family as `target`.
    ///
    /// # Errors
    /// Returns [`TransportError::Io`] if the local socket cannot be bound.
    pub async fn bind(target: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = if target.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self { socket, target })
    }

    /// Destination of every datagram.
    #[must_use]
    pub const fn target(&self) -> SocketAddr { self.target }

    /// Local address of the sending socket.
    ///
    /// # Errors
    /// Propagates the socket query failure.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.socket.local_addr() }

    /// Send `bytes` as one datagram.
    ///
    /// # Errors
    /// Returns [`TransportError::DatagramTooLarge`] for buffers over 65507
    /// bytes, or [`TransportError::Io`] when the OS rejects the send.
    pub async fn send_to(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if bytes.len() > MAX_DATAGRAM_LEN {
            return Err(TransportError::DatagramTooLarge(bytes.len()));
        }
        let sent = self.socket.send_to(bytes, self.target).await?;
        if sent != bytes.len() {
            return Err(io::Error::from(io::ErrorKind::WriteZero).into());
        }
        Ok(())
    }
}

#[async_trait]
impl FrameSink for DatagramSession {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> { self.send_to(bytes).await }

    fn is_open(&self) -> bool { true }

    fn kind(&self) -> TransportKind { TransportKind::Datagram }
}
