//! Draining of child stdout/stderr.
//!
//! Piped output is always consumed on background tasks so a chatty child can
//! never block on a full pipe. Lines are forwarded to `tracing` and the most
//! recent ones are kept for failure diagnostics.

use super::{Echo, ProcessId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Bounded buffer holding the last lines a process printed.
#[derive(Debug, Clone)]
pub struct OutputTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl OutputTail {
    /// Creates a tail keeping at most `capacity` lines.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Appends a line, dropping the oldest when full.
    pub fn push(&self, line: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Returns the buffered lines, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

/// Takes the child's piped streams and drains them on spawned tasks.
pub(crate) fn spawn_output_consumers(
    child: &mut Child,
    id: &ProcessId,
    echo: Echo,
    tail: &OutputTail,
) -> Vec<JoinHandle<()>> {
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(drain(stdout, id.to_string(), "stdout", echo, tail.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(drain(stderr, id.to_string(), "stderr", echo, tail.clone())));
    }
    readers
}

/// Longest line kept in the tail; the rest of the line is dropped.
pub(crate) const MAX_LINE_BYTES: usize = 4096;

/// Consecutive read errors tolerated before a stream is abandoned.
const MAX_READ_ERRORS: u32 = 16;

async fn drain<R>(reader: R, process: String, stream: &'static str, echo: Echo, tail: OutputTail)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    // Bytes are consumed until EOF whatever they contain; closing the pipe
    // early would kill the child with SIGPIPE.
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut dropped = 0usize;
    let mut errors = 0u32;
    loop {
        let chunk = match reader.fill_buf().await {
            Ok([]) => break,
            Ok(chunk) => chunk,
            Err(e) => {
                errors += 1;
                debug!(process = %process, stream, error = %e, errors, "error reading output");
                if errors >= MAX_READ_ERRORS {
                    break;
                }
                continue;
            }
        };
        errors = 0;

        let newline = chunk.iter().position(|b| *b == b'\n');
        let body = newline.map_or(chunk, |i| &chunk[..i]);
        let keep = body.len().min(MAX_LINE_BYTES.saturating_sub(line.len()));
        line.extend_from_slice(&body[..keep]);
        dropped += body.len() - keep;
        let consumed = newline.map_or(chunk.len(), |i| i + 1);
        reader.consume(consumed);

        if newline.is_some() {
            emit(&process, stream, echo, &tail, &line, dropped);
            line.clear();
            dropped = 0;
        }
    }
    if !line.is_empty() || dropped > 0 {
        emit(&process, stream, echo, &tail, &line, dropped);
    }
}

fn emit(process: &str, stream: &str, echo: Echo, tail: &OutputTail, raw: &[u8], dropped: usize) {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let mut line = String::from_utf8_lossy(raw).into_owned();
    if dropped > 0 {
        line.push_str(&format!(" [{dropped} bytes truncated]"));
    }
    match echo {
        Echo::On => info!(process = %process, stream, "{process}: {line}"),
        Echo::Off => debug!(process = %process, stream, "{process}: {line}"),
    }
    tail.push(format!("{stream}: {line}"));
}
