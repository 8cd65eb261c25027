//! The relay loop
//!
//! One task owns the listener, every peer socket, the consumer end of the
//! local input queue and local output. Each tick it polls all of them,
//! accepts, reads peers, dequeues at most one chunk and broadcasts it.

use std::sync::Arc;

use tokio::io::AsyncWrite;

use crate::error::Result;
use crate::input::{ChunkQueue, Dequeued};
use crate::registry::PeerRegistry;
use crate::stats::RelayStats;

use super::broadcast::{self, write_local};
use super::config::RelayConfig;
use super::listener::{self, Accepted, Listener};
use super::poll::{self, Readiness, Source};

/// Relay lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Local input open, accepting peers
    Running,
    /// Local input ended; waiting for the remaining peers to leave
    Draining,
}

/// What the loop should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Relay context: everything the loop touches lives here
pub struct Multiplexer<W> {
    config: RelayConfig,
    listener: Option<Listener>,
    registry: PeerRegistry,
    queue: ChunkQueue,
    output: W,
    phase: Phase,
    read_buf: Vec<u8>,
    stats: Arc<RelayStats>,
}

impl<W> Multiplexer<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a relay over a bound listener, a local input queue and local output
    pub fn new(config: RelayConfig, listener: Listener, queue: ChunkQueue, output: W) -> Self {
        let read_buf = vec![0u8; config.buffer_size.max(1)];

        Self {
            config,
            listener: Some(listener),
            registry: PeerRegistry::new(),
            queue,
            output,
            phase: Phase::Running,
            read_buf,
            stats: Arc::new(RelayStats::new()),
        }
    }

    /// Shared handle to the relay counters
    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run until local input has ended and every peer has left
    ///
    /// Returns local output on a clean finish. Only fatal errors (local
    /// output failing) end the loop early.
    pub async fn run(mut self) -> Result<W> {
        if let Some(addr) = self.listener.as_ref().and_then(|l| l.local_addr().ok()) {
            tracing::info!(addr = %addr, "Listening");
        }

        loop {
            if self.tick().await? == Flow::Stop {
                break;
            }
        }

        tracing::info!(
            peers = self.stats.peers_accepted(),
            chunks = self.stats.chunks_broadcast(),
            bytes_to_peers = self.stats.bytes_to_peers(),
            bytes_to_output = self.stats.bytes_to_output(),
            bytes_from_peers = self.stats.bytes_from_peers(),
            uptime_ms = self.stats.uptime().as_millis() as u64,
            "Relay finished"
        );

        Ok(self.output)
    }

    async fn tick(&mut self) -> Result<Flow> {
        let running = self.phase == Phase::Running;
        let readiness = poll::poll_sources(
            self.config.poll_interval,
            self.listener.as_mut(),
            &mut self.registry,
            running.then_some(&mut self.queue),
        )
        .await;

        if readiness.is_readable(Source::Listener) {
            if let Some(accepted) = self.listener.as_mut().and_then(Listener::accept) {
                self.admit(accepted);
            }
            return Ok(Flow::Continue);
        }

        self.read_peers(&readiness).await?;

        if self.phase == Phase::Running {
            self.dequeue(&readiness).await?;
        }

        self.reap();

        if self.phase == Phase::Draining && self.registry.is_empty() {
            return Ok(Flow::Stop);
        }

        Ok(Flow::Continue)
    }

    fn admit(&mut self, accepted: Accepted) {
        match accepted {
            Ok((stream, addr)) => {
                if let Err(e) = listener::configure_socket(&stream, &self.config) {
                    tracing::warn!(peer = %addr, error = %e, "Failed to configure socket");
                }
                self.registry.insert(stream, addr);
                self.stats.record_accept();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to accept connection");
            }
        }
    }

    /// Forward peer input straight to local output
    async fn read_peers(&mut self, readiness: &Readiness) -> Result<()> {
        for id in readiness.readable_peers() {
            let Some(peer) = self.registry.get_mut(id) else {
                continue;
            };

            match peer.try_read(&mut self.read_buf) {
                Ok(0) => peer.mark_closed(),
                Ok(n) => {
                    self.stats.record_peer_input(n as u64);
                    write_local(&mut self.output, &self.read_buf[..n], &self.stats).await?;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    tracing::debug!(peer = %peer.addr(), error = %e, "Read from peer failed");
                    peer.mark_closed();
                }
            }
        }

        Ok(())
    }

    async fn dequeue(&mut self, readiness: &Readiness) -> Result<()> {
        match self.queue.try_next() {
            Dequeued::Empty => {}
            Dequeued::EndOfInput => self.drain(),
            Dequeued::Chunk(chunk) => {
                broadcast::broadcast(
                    &chunk,
                    &readiness.writable,
                    &mut self.registry,
                    &mut self.output,
                    &self.stats,
                )
                .await?;
            }
        }

        Ok(())
    }

    /// Drop every peer that closed or failed a write during this tick
    fn reap(&mut self) {
        let reaped = self.registry.reap();
        if !reaped.is_empty() {
            self.stats.record_closed(reaped.len());
        }
    }

    /// Local input ended: stop accepting and wait for peers to leave
    fn drain(&mut self) {
        self.phase = Phase::Draining;
        self.listener = None;

        tracing::info!(peers = self.registry.open_count(), "Input closed");
    }
}
