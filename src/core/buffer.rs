//! Byte accumulator for frame-to-line reassembly
//!
//! Bytes are appended at the tail as frames arrive and consumed from the
//! head, so arrival order is preserved no matter how the transport split
//! the stream into frames.

use bytes::{Bytes, BytesMut};

/// Line terminator
pub const NEWLINE: u8 = b'\n';

/// Default prompt marker emitted by interactive devices
pub const DEFAULT_PROMPT_MARKER: char = '>';

/// Growable receive buffer with line extraction
#[derive(Debug, Default)]
pub struct LineBuffer {
    inner: BytesMut,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            inner: BytesMut::with_capacity(4096),
        }
    }

    /// Append bytes at the tail
    pub fn extend(&mut self, data: &[u8]) {
        self.inner.extend_from_slice(data);
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Check whether a complete line is buffered
    pub fn has_line(&self) -> bool {
        self.inner.contains(&NEWLINE)
    }

    /// Remove and return the first line, terminator included.
    ///
    /// Returns `None` when no newline is buffered; the partial tail is left
    /// in place for the next frame to complete.
    pub fn take_line(&mut self) -> Option<Bytes> {
        let pos = self.inner.iter().position(|&b| b == NEWLINE)?;
        Some(self.inner.split_to(pos + 1).freeze())
    }

    /// Remove and return everything buffered
    pub fn take_all(&mut self) -> Bytes {
        self.inner.split().freeze()
    }

    /// Remove and return at most `max` bytes from the head
    pub fn take_up_to(&mut self, max: usize) -> Bytes {
        let n = max.min(self.inner.len());
        self.inner.split_to(n).freeze()
    }

    /// Discard everything buffered
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Peek at the buffered bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences instead of failing.
pub fn decode_lossy(data: &[u8]) -> String {
    let mut text = String::with_capacity(data.len());
    for chunk in data.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Check whether a trimmed line looks like an interactive prompt.
///
/// This is a heuristic: payload that happens to end with the marker is
/// indistinguishable from a prompt.
pub fn is_prompt(line: &str, marker: char) -> bool {
    line.ends_with(marker)
}
