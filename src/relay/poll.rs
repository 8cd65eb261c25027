//! Readiness polling over every source the multiplexer watches
//!
//! The listener, the local input queue and each peer all implement
//! [`Pollable`], so one scan covers them regardless of what they are.

use std::future::poll_fn;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::input::ChunkQueue;
use crate::registry::{PeerId, PeerRegistry};

use super::listener::Listener;

/// Something the multiplexer can wait on for input
pub trait Pollable {
    /// Poll for read readiness, registering the waker when not ready
    ///
    /// Errors count as readiness: the subsequent read reports them.
    fn poll_readable(&mut self, cx: &mut Context<'_>) -> Poll<()>;
}

/// A readable source reported by [`poll_sources`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// A connection is waiting to be accepted
    Listener,
    /// Local input has a chunk (or its end) waiting
    Queue,
    /// A peer has data or has closed
    Peer(PeerId),
}

/// Result of one poll
#[derive(Debug, Default)]
pub struct Readiness {
    /// Sources ready for reading, listener first
    pub readable: Vec<Source>,
    /// Open peers ready for writing at the time of the poll
    pub writable: Vec<PeerId>,
}

impl Readiness {
    /// Whether the given source is readable
    pub fn is_readable(&self, source: Source) -> bool {
        self.readable.contains(&source)
    }

    /// Readable peers, in poll order
    pub fn readable_peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.readable.iter().filter_map(|source| match source {
            Source::Peer(id) => Some(*id),
            _ => None,
        })
    }

    /// Whether nothing was readable
    pub fn is_idle(&self) -> bool {
        self.readable.is_empty()
    }
}

/// Wait up to `timeout` for any source to become readable
///
/// `listener` and `queue` are `None` once local input has ended. A timeout
/// yields an idle [`Readiness`].
pub async fn poll_sources(
    timeout: Duration,
    mut listener: Option<&mut Listener>,
    registry: &mut PeerRegistry,
    mut queue: Option<&mut ChunkQueue>,
) -> Readiness {
    let scan = poll_fn(|cx| {
        scan_sources(
            cx,
            listener.as_deref_mut(),
            &mut *registry,
            queue.as_deref_mut(),
        )
    });

    tokio::time::timeout(timeout, scan)
        .await
        .unwrap_or_default()
}

fn scan_sources(
    cx: &mut Context<'_>,
    listener: Option<&mut Listener>,
    registry: &mut PeerRegistry,
    queue: Option<&mut ChunkQueue>,
) -> Poll<Readiness> {
    let mut readiness = Readiness::default();

    if let Some(listener) = listener {
        if listener.poll_readable(cx).is_ready() {
            readiness.readable.push(Source::Listener);
        }
    }

    for peer in registry.iter_mut().filter(|peer| peer.is_open()) {
        if peer.poll_readable(cx).is_ready() {
            readiness.readable.push(Source::Peer(peer.id()));
        }
    }

    if let Some(queue) = queue {
        if queue.poll_readable(cx).is_ready() {
            readiness.readable.push(Source::Queue);
        }
    }

    if readiness.is_idle() {
        return Poll::Pending;
    }

    readiness.writable = registry
        .iter_mut()
        .filter(|peer| peer.is_open())
        .filter_map(|peer| peer.poll_writable(cx).then(|| peer.id()))
        .collect();

    Poll::Ready(readiness)
}
