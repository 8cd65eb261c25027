//! Peer entry and state types

use std::io;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::relay::poll::Pollable;

/// Identifier assigned to a peer on accept
pub type PeerId = u64;

/// State of a peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Connection usable in both directions
    Open,
    /// A write failed; removed at the end of the tick
    WriteFailed,
    /// Remote end closed or a read failed; removed at the end of the tick
    Closed,
}

/// A connected TCP client
///
/// The socket is owned here and closed when the peer is dropped, which only
/// happens when the registry removes it.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    addr: SocketAddr,
    stream: TcpStream,
    state: PeerState,
    opened_at: Instant,

    /// Set once the reactor has reported the socket writable
    write_ready_seen: bool,

    /// Bytes read from this peer
    pub bytes_received: u64,

    /// Bytes written to this peer
    pub bytes_sent: u64,
}

impl Peer {
    pub(super) fn new(id: PeerId, stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            stream,
            state: PeerState::Open,
            opened_at: Instant::now(),
            write_ready_seen: false,
            bytes_received: 0,
            bytes_sent: 0,
        }
    }

    /// Peer id
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Remote address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current state
    pub fn state(&self) -> PeerState {
        self.state
    }

    /// Whether the peer should still be read from and written to
    pub fn is_open(&self) -> bool {
        self.state == PeerState::Open
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Mark the peer closed by its remote end
    pub fn mark_closed(&mut self) {
        self.state = PeerState::Closed;
    }

    /// Mark a failed write, unless the peer is already closed
    pub fn mark_write_failed(&mut self) {
        if self.state == PeerState::Open {
            self.state = PeerState::WriteFailed;
        }
    }

    /// Non-blocking read into `buf`
    ///
    /// `Ok(0)` means the remote end closed. `WouldBlock` means the readiness
    /// was spurious.
    pub fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.stream.try_read(buf)?;
        self.bytes_received += n as u64;
        Ok(n)
    }

    /// Write the whole chunk, retrying partial writes
    pub async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.bytes_sent += data.len() as u64;
        self.write_ready_seen = true;
        Ok(())
    }

    /// Sample write readiness, registering the waker when not ready
    ///
    /// A freshly accepted socket counts as writable until the reactor has
    /// reported it once. After that, only a write that hit `WouldBlock` can
    /// make it report not ready.
    pub fn poll_writable(&mut self, cx: &mut Context<'_>) -> bool {
        match self.stream.poll_write_ready(cx) {
            Poll::Ready(_) => {
                self.write_ready_seen = true;
                true
            }
            Poll::Pending => !self.write_ready_seen,
        }
    }
}

impl Pollable for Peer {
    fn poll_readable(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        self.stream.poll_read_ready(cx).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    async fn connected_peer() -> (Peer, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, addr) = listener.accept().await.unwrap();
        (Peer::new(1, stream, addr), client)
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let (mut peer, _client) = connected_peer().await;
        assert!(peer.is_open());

        peer.mark_write_failed();
        assert_eq!(peer.state(), PeerState::WriteFailed);

        peer.mark_closed();
        assert_eq!(peer.state(), PeerState::Closed);

        // A closed peer stays closed
        peer.mark_write_failed();
        assert_eq!(peer.state(), PeerState::Closed);
    }

    #[tokio::test]
    async fn test_fresh_peer_counts_as_writable() {
        let (mut peer, _client) = connected_peer().await;
        let mut task = tokio_test::task::spawn(std::future::poll_fn(|cx| {
            Poll::Ready(peer.poll_writable(cx))
        }));

        // Whatever the reactor has seen so far, a new connection is a target
        tokio_test::assert_ready_eq!(task.poll(), true);
    }

    #[tokio::test]
    async fn test_send_counts_bytes() {
        let (mut peer, mut client) = connected_peer().await;

        peer.send(b"hello").await.unwrap();
        assert_eq!(peer.bytes_sent, 5);

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_try_read_reports_close() {
        let (mut peer, client) = connected_peer().await;
        drop(client);

        let mut buf = [0u8; 16];
        loop {
            std::future::poll_fn(|cx| peer.poll_readable(cx)).await;
            match peer.try_read(&mut buf) {
                Ok(n) => {
                    assert_eq!(n, 0);
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }
}
