//! Local input side of the relay
//!
//! ```text
//!   stdin ──► [reader thread] ──► ChunkSender ══ unbounded mpsc ══ ChunkQueue ──► Multiplexer
//!             blocking reads                                       try_next() / poll
//! ```
//!
//! End of input is carried in-band as a zero-length chunk. The queue is
//! unbounded: a producer that outpaces the peers grows it without limit.

pub mod queue;
pub mod reader;

pub use queue::{channel, ChunkQueue, ChunkSender, Dequeued};
pub use reader::{read_into, spawn_reader, ReadMode};
