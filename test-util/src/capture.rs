//! Loopback receiver that records every frame it decodes.
//!
//! TCP connections are read through [`EventCodec`], so frames are recovered
//! however the sender split or coalesced its writes. Each UDP datagram is
//! parsed as exactly one frame. Background tasks are aborted when the server
//! is dropped.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::{
        Arc,
        Mutex,
        PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use evstress::frame::{DecodedFrame, EventCodec, MAX_DATAGRAM_LEN, parse_frame};
use futures_util::StreamExt;
use tokio::{
    net::{TcpListener, TcpStream, UdpSocket},
    sync::Notify,
    task::JoinSet,
    time::{Instant, timeout_at},
};
use tokio_util::codec::FramedRead;
use tracing::{debug, warn};

/// Transport a frame arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingress {
    /// Decoded from a TCP byte stream.
    Tcp,
    /// Parsed from a single UDP datagram.
    Udp,
}

/// A frame and the transport that delivered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Delivering transport.
    pub ingress: Ingress,
    /// Decoded frame.
    pub frame: DecodedFrame,
}

#[derive(Debug, Default)]
struct Shared {
    frames: Mutex<Vec<CapturedFrame>>,
    arrived: Notify,
    connections: AtomicUsize,
    rejected: AtomicUsize,
}

impl Shared {
    fn push(&self, ingress: Ingress, frame: DecodedFrame) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedFrame { ingress, frame });
        self.arrived.notify_waiters();
    }

    fn reject(&self) { self.rejected.fetch_add(1, Ordering::Relaxed); }
}

/// Capture receiver bound to ephemeral loopback ports.
#[derive(Debug)]
pub struct CaptureServer {
    tcp_addr: SocketAddr,
    udp_addr: SocketAddr,
    shared: Arc<Shared>,
    _tasks: JoinSet<()>,
}

impl CaptureServer {
    /// Bind TCP and UDP on `127.0.0.1:0` and start receiving.
    ///
    /// # Errors
    /// Returns any bind error.
    pub async fn start() -> io::Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let tcp_addr = listener.local_addr()?;
        let udp_addr = socket.local_addr()?;
        let shared = Arc::new(Shared::default());
        let mut tasks = JoinSet::new();
        tasks.spawn(accept_loop(listener, Arc::clone(&shared)));
        tasks.spawn(datagram_loop(socket, Arc::clone(&shared)));
        debug!(%tcp_addr, %udp_addr, "capture server listening");
        Ok(Self {
            tcp_addr,
            udp_addr,
            shared,
            _tasks: tasks,
        })
    }

    /// TCP address to connect to.
    #[must_use]
    pub const fn tcp_addr(&self) -> SocketAddr { self.tcp_addr }

    /// UDP address to send to.
    #[must_use]
    pub const fn udp_addr(&self) -> SocketAddr { self.udp_addr }

    /// Frames captured so far, in arrival order.
    #[must_use]
    pub fn frames(&self) -> Vec<CapturedFrame> {
        self.shared
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// TCP connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize { self.shared.connections.load(Ordering::Relaxed) }

    /// Streams or datagrams that failed to decode.
    #[must_use]
    pub fn rejected(&self) -> usize { self.shared.rejected.load(Ordering::Relaxed) }

    /// Wait until at least `count` frames arrived or `limit` elapsed, then
    /// return everything captured.
    #[must_use]
    pub async fn wait_for_frames(&self, count: usize, limit: Duration) -> Vec<CapturedFrame> {
        let deadline = Instant::now() + limit;
        loop {
            let arrived = self.shared.arrived.notified();
            let frames = self.frames();
            if frames.len() >= count {
                return frames;
            }
            if timeout_at(deadline, arrived).await.is_err() {
                return self.frames();
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    let mut readers = JoinSet::new();
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                shared.connections.fetch_add(1, Ordering::Relaxed);
                debug!(%peer, "capture connection accepted");
                readers.spawn(read_stream(stream, Arc::clone(&shared)));
            }
            Err(err) => {
                warn!(error = %err, "capture accept failed");
                return;
            }
        }
    }
}

async fn read_stream(stream: TcpStream, shared: Arc<Shared>) {
    let mut frames = FramedRead::new(stream, EventCodec::new());
    while let Some(item) = frames.next().await {
        match item {
            Ok(frame) => shared.push(Ingress::Tcp, frame),
            Err(err) => {
                warn!(error = %err, "capture stream rejected");
                shared.reject();
                return;
            }
        }
    }
}

async fn datagram_loop(socket: UdpSocket, shared: Arc<Shared>) {
    let mut buf = vec![0_u8; MAX_DATAGRAM_LEN + 1];
    loop {
        let len = match socket.recv_from(&mut buf).await {
            Ok((len, _)) => len,
            Err(err) => {
                warn!(error = %err, "capture datagram receive failed");
                continue;
            }
        };
        match buf.get(..len).map(parse_frame) {
            Some(Ok(frame)) => shared.push(Ingress::Udp, frame),
            Some(Err(err)) => {
                warn!(error = %err, "capture datagram rejected");
                shared.reject();
            }
            None => shared.reject(),
        }
    }
}

/// A loopback address with nothing listening on it.
///
/// # Errors
/// Returns any bind error.
pub async fn refused_addr() -> io::Result<SocketAddr> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}
