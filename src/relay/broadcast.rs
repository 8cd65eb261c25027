//! Fan-out of local input chunks
//!
//! A chunk goes to every writable, open peer. With no such peer it goes to
//! local output instead, so the relay behaves as a pass-through when nobody
//! is listening.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::registry::{PeerId, PeerRegistry};
use crate::stats::RelayStats;

/// Where a chunk ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to peers; `failed` of the attempted writes errored
    Peers { delivered: usize, failed: usize },
    /// No writable peers, written to local output
    Local,
}

/// Deliver one chunk
///
/// Individual peer failures mark the peer and never abort the batch. Only a
/// failure of local output is returned as an error.
pub async fn broadcast<W>(
    chunk: &Bytes,
    writable: &[PeerId],
    registry: &mut PeerRegistry,
    output: &mut W,
    stats: &RelayStats,
) -> Result<Delivery>
where
    W: AsyncWrite + Unpin,
{
    let targets: Vec<PeerId> = writable
        .iter()
        .copied()
        .filter(|id| registry.get(*id).is_some_and(|peer| peer.is_open()))
        .collect();

    if targets.is_empty() {
        write_local(output, chunk, stats).await?;
        return Ok(Delivery::Local);
    }

    let mut delivered = 0;
    let mut failed = 0;

    for id in targets {
        let Some(peer) = registry.get_mut(id) else {
            continue;
        };

        match peer.send(chunk).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::debug!(peer = %peer.addr(), error = %e, "Write to peer failed");
                peer.mark_write_failed();
                failed += 1;
            }
        }
    }

    stats.record_broadcast((delivered * chunk.len()) as u64);

    Ok(Delivery::Peers { delivered, failed })
}

/// Write bytes to local output and flush
pub async fn write_local<W>(output: &mut W, data: &[u8], stats: &RelayStats) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(data).await.map_err(Error::Output)?;
    output.flush().await.map_err(Error::Output)?;
    stats.record_output(data.len() as u64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;

    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::registry::PeerState;

    async fn add_peer(listener: &TcpListener, registry: &mut PeerRegistry) -> (PeerId, TcpStream) {
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (stream, addr) = listener.accept().await.unwrap();
        (registry.insert(stream, addr), client)
    }

    #[tokio::test]
    async fn test_no_peers_goes_to_local_output() {
        let mut registry = PeerRegistry::new();
        let stats = RelayStats::new();
        let mut output = tokio_test::io::Builder::new().write(b"A").write(b"B").build();

        let first = broadcast(&Bytes::from_static(b"A"), &[], &mut registry, &mut output, &stats)
            .await
            .unwrap();
        let second = broadcast(&Bytes::from_static(b"B"), &[], &mut registry, &mut output, &stats)
            .await
            .unwrap();

        assert_eq!(first, Delivery::Local);
        assert_eq!(second, Delivery::Local);
        assert_eq!(stats.bytes_to_output(), 2);
        assert_eq!(stats.chunks_broadcast(), 0);
    }

    #[tokio::test]
    async fn test_writes_to_all_writable_peers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut registry = PeerRegistry::new();
        let stats = RelayStats::new();
        // Any write to local output would fail the mock
        let mut output = tokio_test::io::Builder::new().build();

        let (id1, mut c1) = add_peer(&listener, &mut registry).await;
        let (id2, mut c2) = add_peer(&listener, &mut registry).await;

        let delivery = broadcast(
            &Bytes::from_static(b"X"),
            &[id1, id2],
            &mut registry,
            &mut output,
            &stats,
        )
        .await
        .unwrap();

        assert_eq!(delivery, Delivery::Peers { delivered: 2, failed: 0 });
        assert_eq!(stats.bytes_to_peers(), 2);

        let mut buf = [0u8; 1];
        c1.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"X");
        c2.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"X");
    }

    #[tokio::test]
    async fn test_skips_peers_not_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut registry = PeerRegistry::new();
        let stats = RelayStats::new();
        let mut output = tokio_test::io::Builder::new().build();

        let (open, mut c_open) = add_peer(&listener, &mut registry).await;
        let (closed, _c_closed) = add_peer(&listener, &mut registry).await;
        registry.get_mut(closed).unwrap().mark_closed();

        let delivery = broadcast(
            &Bytes::from_static(b"Y"),
            &[open, closed],
            &mut registry,
            &mut output,
            &stats,
        )
        .await
        .unwrap();

        assert_eq!(delivery, Delivery::Peers { delivered: 1, failed: 0 });
        assert_eq!(registry.get(closed).unwrap().bytes_sent, 0);

        let mut buf = [0u8; 1];
        c_open.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"Y");
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_reset_peer_does_not_abort_batch() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut registry = PeerRegistry::new();
        let stats = RelayStats::new();
        let mut output = tokio_test::io::Builder::new().build();

        let (healthy, mut c_healthy) = add_peer(&listener, &mut registry).await;
        let (reset, c_reset) = add_peer(&listener, &mut registry).await;

        // Zero linger makes the drop send RST instead of FIN
        c_reset.set_linger(Some(std::time::Duration::ZERO)).unwrap();
        drop(c_reset);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let delivery = broadcast(
            &Bytes::from_static(b"R"),
            &[reset, healthy],
            &mut registry,
            &mut output,
            &stats,
        )
        .await
        .unwrap();

        assert_eq!(delivery, Delivery::Peers { delivered: 1, failed: 1 });
        assert_eq!(registry.get(reset).unwrap().state(), PeerState::WriteFailed);
        assert!(registry.get(healthy).unwrap().is_open());

        let mut buf = [0u8; 1];
        c_healthy.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"R");
    }

    #[tokio::test]
    async fn test_only_stale_targets_falls_back_to_local() {
        let mut registry = PeerRegistry::new();
        let stats = RelayStats::new();
        let mut output = tokio_test::io::Builder::new().write(b"Z").build();

        let delivery = broadcast(&Bytes::from_static(b"Z"), &[42], &mut registry, &mut output, &stats)
            .await
            .unwrap();

        assert_eq!(delivery, Delivery::Local);
    }

    #[tokio::test]
    async fn test_local_output_failure_is_fatal() {
        let stats = RelayStats::new();
        let mut output = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();

        let result = write_local(&mut output, b"data", &stats).await;

        assert!(matches!(result, Err(Error::Output(_))));
        assert_eq!(stats.bytes_to_output(), 0);
    }
}
