//! Relay core
//!
//! This module provides:
//! - Configuration and the listening socket
//! - The readiness poll shared by the listener, the input queue and peers
//! - Broadcast of local input to peers
//! - The multiplexer loop tying it all together

pub mod broadcast;
pub mod config;
pub mod listener;
pub mod multiplexer;
pub mod poll;

pub use broadcast::Delivery;
pub use config::RelayConfig;
pub use listener::Listener;
pub use multiplexer::{Multiplexer, Phase};
pub use poll::{Pollable, Readiness, Source};
