//! Chunk queue between the local input reader and the multiplexer
//!
//! The producer side is a plain unbounded sender that can be used from a
//! blocking OS thread. The consumer side never blocks: the multiplexer
//! either polls it for readiness alongside its sockets or calls
//! [`ChunkQueue::try_next`].

use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::relay::poll::Pollable;

/// Outcome of a non-blocking dequeue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeued {
    /// Nothing is waiting
    Empty,
    /// A chunk of local input
    Chunk(Bytes),
    /// Local input has ended (sentinel seen or producer gone)
    EndOfInput,
}

impl Dequeued {
    fn from_chunk(chunk: Bytes) -> Self {
        if chunk.is_empty() {
            Dequeued::EndOfInput
        } else {
            Dequeued::Chunk(chunk)
        }
    }
}

/// Create a connected sender/queue pair
pub fn channel() -> (ChunkSender, ChunkQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChunkSender { tx }, ChunkQueue { rx, staged: None })
}

/// Producer half of the queue
#[derive(Debug, Clone)]
pub struct ChunkSender {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ChunkSender {
    /// Enqueue a chunk
    ///
    /// Empty chunks are ignored so that only [`ChunkSender::close`] can
    /// produce the end-of-input sentinel. Returns `false` once the consumer
    /// has been dropped.
    pub fn push(&self, chunk: impl Into<Bytes>) -> bool {
        let chunk = chunk.into();
        if chunk.is_empty() {
            return !self.tx.is_closed();
        }
        self.tx.send(chunk).is_ok()
    }

    /// Enqueue the end-of-input sentinel
    pub fn close(&self) -> bool {
        self.tx.send(Bytes::new()).is_ok()
    }
}

/// Consumer half of the queue, owned by the multiplexer
#[derive(Debug)]
pub struct ChunkQueue {
    rx: mpsc::UnboundedReceiver<Bytes>,

    /// Chunk taken off the channel by a readiness poll, handed out first
    staged: Option<Dequeued>,
}

impl ChunkQueue {
    /// Take the next chunk without waiting
    pub fn try_next(&mut self) -> Dequeued {
        if let Some(staged) = self.staged.take() {
            return staged;
        }

        match self.rx.try_recv() {
            Ok(chunk) => Dequeued::from_chunk(chunk),
            Err(TryRecvError::Empty) => Dequeued::Empty,
            Err(TryRecvError::Disconnected) => Dequeued::EndOfInput,
        }
    }
}

impl Pollable for ChunkQueue {
    fn poll_readable(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.staged.is_some() {
            return Poll::Ready(());
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                self.staged = Some(Dequeued::from_chunk(chunk));
                Poll::Ready(())
            }
            Poll::Ready(None) => {
                self.staged = Some(Dequeued::EndOfInput);
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
