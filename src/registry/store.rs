//! Peer registry implementation
//!
//! Owned and mutated by the multiplexer only, so no locking is needed.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::net::TcpStream;

use super::peer::{Peer, PeerId, PeerState};

/// Set of live peers keyed by id
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, Peer>,
    next_id: PeerId,
}

impl PeerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register an accepted connection
    pub fn insert(&mut self, stream: TcpStream, addr: SocketAddr) -> PeerId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;

        self.peers.insert(id, Peer::new(id, stream, addr));

        tracing::info!(peer = %addr, peer_id = id, peers = self.peers.len(), "Peer opened");
        id
    }

    /// Look up a peer
    pub fn get(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    /// Look up a peer mutably
    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(&id)
    }

    /// Iterate over all peers, whatever their state
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Iterate mutably over all peers
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Peer> {
        self.peers.values_mut()
    }

    /// Number of registered peers, including ones awaiting removal
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peers are registered
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Number of peers still open
    pub fn open_count(&self) -> usize {
        self.peers.values().filter(|peer| peer.is_open()).count()
    }

    /// Remove every peer that is no longer open
    ///
    /// This is the only removal path. Dropping the removed peers closes their
    /// sockets, so each socket is closed exactly once. Returns the ids removed.
    pub fn reap(&mut self) -> Vec<PeerId> {
        let dead: Vec<PeerId> = self
            .peers
            .values()
            .filter(|peer| !peer.is_open())
            .map(Peer::id)
            .collect();

        for id in &dead {
            if let Some(peer) = self.peers.remove(id) {
                let reason = match peer.state() {
                    PeerState::WriteFailed => "write failed",
                    _ => "closed by peer",
                };
                tracing::info!(
                    peer = %peer.addr(),
                    peer_id = peer.id(),
                    reason = reason,
                    bytes_sent = peer.bytes_sent,
                    bytes_received = peer.bytes_received,
                    duration_ms = peer.duration().as_millis() as u64,
                    "Peer closed"
                );
            }
        }

        dead
    }
}
