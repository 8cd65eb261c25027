//! Local input reader
//!
//! Performs blocking reads on a dedicated OS thread and hands every chunk to
//! the multiplexer through the [`ChunkQueue`](super::ChunkQueue). The thread
//! is detached: it ends on end-of-stream, on a read error, or once the
//! multiplexer has dropped its queue, and process exit never waits for it.

use std::io::{self, BufRead, BufReader, Read};
use std::thread;

use super::queue::{self, ChunkQueue, ChunkSender};

/// How local input is split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Whatever one read returns, up to the buffer size
    #[default]
    Chunk,
    /// One line per chunk, including the trailing newline
    Line,
}

/// Spawn the reader thread over `input`
///
/// Returns the consumer end of the queue the thread feeds.
pub fn spawn_reader<R>(input: R, mode: ReadMode, buffer_size: usize) -> io::Result<ChunkQueue>
where
    R: Read + Send + 'static,
{
    let (tx, queue) = queue::channel();

    thread::Builder::new()
        .name("pipecast-input".into())
        .spawn(move || read_into(input, mode, buffer_size, &tx))?;

    Ok(queue)
}

/// Read `input` to exhaustion, pushing chunks into `tx`
///
/// Always finishes with exactly one end-of-input sentinel unless the
/// consumer went away first. Returns the number of payload bytes queued.
pub fn read_into<R: Read>(input: R, mode: ReadMode, buffer_size: usize, tx: &ChunkSender) -> u64 {
    let buffer_size = buffer_size.max(1);
    let result = match mode {
        ReadMode::Chunk => read_chunks(input, buffer_size, tx),
        ReadMode::Line => read_lines(BufReader::with_capacity(buffer_size, input), tx),
    };

    match result {
        Ok(Some(total)) => {
            tracing::debug!(bytes = total, "Local input reached end of stream");
            tx.close();
            total
        }
        Ok(None) => {
            tracing::debug!("Queue consumer gone, reader exiting");
            0
        }
        Err((total, e)) => {
            tracing::warn!(error = %e, "Local input read failed, treating as end of stream");
            tx.close();
            total
        }
    }
}

type ReadOutcome = Result<Option<u64>, (u64, io::Error)>;

fn read_chunks<R: Read>(mut input: R, buffer_size: usize, tx: &ChunkSender) -> ReadOutcome {
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;

    loop {
        match input.read(&mut buf) {
            Ok(0) => return Ok(Some(total)),
            Ok(n) => {
                total += n as u64;
                if !tx.push(buf[..n].to_vec()) {
                    return Ok(None);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err((total, e)),
        }
    }
}

fn read_lines<R: BufRead>(mut input: R, tx: &ChunkSender) -> ReadOutcome {
    let mut total = 0u64;

    loop {
        let mut line = Vec::new();
        match input.read_until(b'\n', &mut line) {
            Ok(0) => return Ok(Some(total)),
            Ok(n) => {
                total += n as u64;
                if !tx.push(line) {
                    return Ok(None);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err((total, e)),
        }
    }
}
