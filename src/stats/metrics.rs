//! Statistics for a relay run

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live relay counters
///
/// Updated by the multiplexer, readable from anywhere through an `Arc`.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    peers_accepted: AtomicU64,
    peers_closed: AtomicU64,
    chunks_broadcast: AtomicU64,
    bytes_to_peers: AtomicU64,
    bytes_to_output: AtomicU64,
    bytes_from_peers: AtomicU64,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            peers_accepted: AtomicU64::new(0),
            peers_closed: AtomicU64::new(0),
            chunks_broadcast: AtomicU64::new(0),
            bytes_to_peers: AtomicU64::new(0),
            bytes_to_output: AtomicU64::new(0),
            bytes_from_peers: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_accept(&self) {
        self.peers_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_closed(&self, count: usize) {
        self.peers_closed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, bytes_to_peers: u64) {
        self.chunks_broadcast.fetch_add(1, Ordering::Relaxed);
        self.bytes_to_peers.fetch_add(bytes_to_peers, Ordering::Relaxed);
    }

    pub(crate) fn record_output(&self, bytes: u64) {
        self.bytes_to_output.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_peer_input(&self, bytes: u64) {
        self.bytes_from_peers.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Total peers ever accepted
    pub fn peers_accepted(&self) -> u64 {
        self.peers_accepted.load(Ordering::Relaxed)
    }

    /// Total peers removed
    pub fn peers_closed(&self) -> u64 {
        self.peers_closed.load(Ordering::Relaxed)
    }

    /// Peers currently registered
    pub fn active_peers(&self) -> u64 {
        self.peers_accepted().saturating_sub(self.peers_closed())
    }

    /// Chunks of local input delivered to at least one peer
    pub fn chunks_broadcast(&self) -> u64 {
        self.chunks_broadcast.load(Ordering::Relaxed)
    }

    /// Bytes written to peers, counted once per peer
    pub fn bytes_to_peers(&self) -> u64 {
        self.bytes_to_peers.load(Ordering::Relaxed)
    }

    /// Bytes written to local output
    pub fn bytes_to_output(&self) -> u64 {
        self.bytes_to_output.load(Ordering::Relaxed)
    }

    /// Bytes read from peers
    pub fn bytes_from_peers(&self) -> u64 {
        self.bytes_from_peers.load(Ordering::Relaxed)
    }

    /// Time since the counters were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}
