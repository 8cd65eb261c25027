//! Peer registry
//!
//! Tracks every TCP client connected to the relay.
//!
//! # Peer lifecycle
//!
//! ```text
//!   accept ──► Open ──┬── read returns 0 / read error ──► Closed ──────┐
//!                     │                                                ├──► reap() ──► socket dropped
//!                     └── write error ──────────────────► WriteFailed ┘
//! ```
//!
//! Both failure channels end in the same removal path at the end of a
//! multiplexer tick.

pub mod peer;
pub mod store;

pub use peer::{Peer, PeerId, PeerState};
pub use store::PeerRegistry;
