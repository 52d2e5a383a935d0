//! Framed-to-line adapter
//!
//! Turns a [`FrameTransport`] whose frames split the byte stream at
//! arbitrary points into a timeout-bounded, line-oriented reader for
//! command/response terminals.
//!
//! Idle is the normal state of such a link, so none of the read operations
//! fail when nothing arrives: they return whatever was collected, possibly
//! nothing. Only genuine transport failures are returned as errors.

use super::buffer::{decode_lossy, is_prompt, LineBuffer, DEFAULT_PROMPT_MARKER};
use super::transport::{FrameTransport, TimeoutGuard, TransportError};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Receive timeout assumed when the transport has none configured
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Read timing and heuristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Longest single pull while waiting for a line, in milliseconds
    pub poll_interval_ms: u64,
    /// Pull duration used by the data-available probe, in milliseconds
    pub probe_interval_ms: u64,
    /// Per-receive timeout while draining on flush, in milliseconds
    pub drain_timeout_ms: u64,
    /// Upper bound on a whole flush, in milliseconds
    pub flush_limit_ms: u64,
    /// Trailing character identifying a prompt line
    pub prompt_marker: char,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            probe_interval_ms: 50,
            drain_timeout_ms: 100,
            flush_limit_ms: 2000,
            prompt_marker: DEFAULT_PROMPT_MARKER,
        }
    }
}

impl ReaderConfig {
    /// Poll quantum for line reads
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Probe quantum for `bytes_available`
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms.max(1))
    }

    /// Drain timeout for `flush`
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms.max(1))
    }

    /// Flush time limit
    pub fn flush_limit(&self) -> Duration {
        Duration::from_millis(self.flush_limit_ms)
    }
}

/// Adapter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Reads and writes allowed
    Open,
    /// Terminal; every operation fails with `NotConnected`
    Closed,
}

/// Line-oriented reader over a frame transport.
///
/// Operations take `&mut self`: one caller drives a connection at a time.
pub struct FramedLineAdapter<T: FrameTransport> {
    transport: T,
    buffer: LineBuffer,
    config: ReaderConfig,
    state: AdapterState,
}

impl<T: FrameTransport> FramedLineAdapter<T> {
    /// Wrap an already connected transport
    pub fn new(transport: T, config: ReaderConfig) -> Self {
        Self {
            transport,
            buffer: LineBuffer::new(),
            config,
            state: AdapterState::Open,
        }
    }

    /// Connect the transport if needed and wrap it
    pub async fn open(mut transport: T, config: ReaderConfig) -> Result<Self, TransportError> {
        if !transport.is_connected() {
            transport.connect().await?;
        }
        debug!(target = %transport.connection_info(), "adapter open");
        Ok(Self::new(transport, config))
    }

    /// Current state
    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Check if the adapter is open
    pub fn is_open(&self) -> bool {
        self.state == AdapterState::Open
    }

    /// Bytes currently buffered, without pulling
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Read configuration
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Session default receive timeout
    pub fn default_timeout(&self) -> Duration {
        self.transport.timeout().unwrap_or(DEFAULT_READ_TIMEOUT)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        match self.state {
            AdapterState::Open => Ok(()),
            AdapterState::Closed => Err(TransportError::NotConnected),
        }
    }

    /// Send one text frame as-is
    pub async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        self.ensure_open()?;
        trace!(len = text.len(), "send frame");
        self.transport.send_frame(text).await
    }

    /// Move every frame the transport has ready into the buffer.
    ///
    /// Spends at most `timeout` in total. Frames that are already waiting are
    /// drained even when `timeout` is zero. A receive timeout or an empty frame
    /// ends the pull. The transport timeout is restored on return.
    pub async fn pull(&mut self, timeout: Duration) -> Result<usize, TransportError> {
        self.ensure_open()?;

        let deadline = Instant::now() + timeout;
        let mut transport = TimeoutGuard::new(&mut self.transport, timeout);
        let mut appended = 0;

        // A zero timeout still polls once, so frames already queued are taken
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            transport.set_timeout(Some(remaining));

            match transport.receive_frame().await {
                Ok(frame) if frame.is_empty() => break,
                Ok(frame) => {
                    let data = frame.into_bytes();
                    trace!(len = data.len(), "frame received");
                    appended += data.len();
                    self.buffer.extend(&data);
                }
                Err(e) if e.is_timeout() => break,
                Err(e) => return Err(e),
            }
        }

        Ok(appended)
    }

    /// Read the next line, terminator included.
    ///
    /// If no newline shows up before `timeout`, returns whatever partial
    /// bytes are buffered (possibly none) and clears them.
    pub async fn read_line(&mut self, timeout: Duration) -> Result<Bytes, TransportError> {
        self.ensure_open()?;

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(line) = self.buffer.take_line() {
                return Ok(line);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            self.pull(remaining.min(self.config.poll_interval())).await?;

            if remaining.is_zero() {
                return Ok(match self.buffer.take_line() {
                    Some(line) => line,
                    None => self.buffer.take_all(),
                });
            }
        }
    }

    /// Buffered byte count after a short pull.
    ///
    /// A cheap "anything worth reading" probe; frames may still be in flight.
    pub async fn bytes_available(&mut self) -> Result<usize, TransportError> {
        let probe = self.config.probe_interval();
        self.pull(probe).await?;
        Ok(self.buffer.len())
    }

    /// Discard the buffer and drain the transport until it goes quiet
    pub async fn flush(&mut self) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.buffer.clear();

        let limit = Instant::now() + self.config.flush_limit();
        let mut transport = TimeoutGuard::new(&mut self.transport, self.config.drain_timeout());
        let mut discarded = 0usize;

        loop {
            if Instant::now() >= limit {
                warn!(discarded, "transport still busy at flush limit");
                break;
            }
            match transport.receive_frame().await {
                Ok(frame) if frame.is_empty() => break,
                Ok(frame) => discarded += frame.len(),
                Err(e) if e.is_timeout() => break,
                Err(e) => return Err(e),
            }
        }

        debug!(discarded, "flushed");
        Ok(())
    }

    /// Discard `count` lines, e.g. the device echoing our commands back
    pub async fn clear_echoes(&mut self, count: usize) -> Result<(), TransportError> {
        let timeout = self.default_timeout();
        for _ in 0..count {
            let echo = self.read_line(timeout).await?;
            trace!(echo = %decode_lossy(&echo).trim(), "skipped echo");
        }
        Ok(())
    }

    /// Skip `skip` echoed lines, then collect trimmed non-empty lines until
    /// nothing has arrived for `timeout`.
    ///
    /// A trailing prompt line is dropped. This is a heuristic: a final payload
    /// line that happens to end with the prompt marker is dropped too.
    pub async fn receive_lines(
        &mut self,
        skip: usize,
        timeout: Duration,
    ) -> Result<Vec<String>, TransportError> {
        self.clear_echoes(skip).await?;

        let mut lines = Vec::new();
        let mut last_data = Instant::now();

        loop {
            if self.bytes_available().await? > 0 {
                let line = self.read_line(timeout).await?;
                let text = decode_lossy(&line);
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(text.to_string());
                }
                last_data = Instant::now();
            } else if last_data.elapsed() >= timeout {
                break;
            }
        }

        if lines
            .last()
            .is_some_and(|line| is_prompt(line, self.config.prompt_marker))
        {
            lines.pop();
        }

        debug!(count = lines.len(), "received lines");
        Ok(lines)
    }

    /// Collect non-prompt lines until no non-empty line has arrived for
    /// `timeout`.
    ///
    /// Silence is measured across idle waits too, not only between lines.
    pub async fn receive_until_silence(
        &mut self,
        timeout: Duration,
    ) -> Result<Vec<String>, TransportError> {
        self.ensure_open()?;

        let mut lines = Vec::new();
        let mut last_activity = Instant::now();

        loop {
            if self.bytes_available().await? > 0 {
                let line = self.read_line(timeout).await?;
                let text = decode_lossy(&line);
                let text = text.trim();
                if !text.is_empty() {
                    if !is_prompt(text, self.config.prompt_marker) {
                        lines.push(text.to_string());
                    }
                    last_activity = Instant::now();
                }
            } else {
                let idle = last_activity.elapsed();
                if idle >= timeout {
                    break;
                }
                // Timer-bounded wait that returns as soon as a frame lands
                let wait = self.config.probe_interval().min(timeout - idle);
                self.pull(wait).await?;
            }
        }

        debug!(count = lines.len(), "silence reached");
        Ok(lines)
    }

    /// Collect raw bytes until `timeout` of silence, or until `max_bytes`
    /// have been collected.
    ///
    /// When the limit is hit the result is exactly `max_bytes` long; anything
    /// past it stays buffered for the next read instead of being discarded;
    /// callers that want a clean buffer afterwards should `flush`.
    pub async fn receive_raw(
        &mut self,
        timeout: Duration,
        max_bytes: Option<usize>,
    ) -> Result<Bytes, TransportError> {
        self.ensure_open()?;

        if max_bytes == Some(0) {
            return Ok(Bytes::new());
        }

        let mut collected = BytesMut::new();
        let mut last_data = Instant::now();
        let quantum = self.config.poll_interval().min(timeout);

        loop {
            self.pull(quantum).await?;

            if self.buffer.is_empty() {
                if last_data.elapsed() >= timeout {
                    break;
                }
                continue;
            }

            match max_bytes {
                Some(max) => {
                    let chunk = self.buffer.take_up_to(max - collected.len());
                    collected.extend_from_slice(&chunk);
                    if collected.len() >= max {
                        debug!(len = collected.len(), "raw read hit byte limit");
                        return Ok(collected.freeze());
                    }
                }
                None => collected.extend_from_slice(&self.buffer.take_all()),
            }
            last_data = Instant::now();
        }

        debug!(len = collected.len(), "raw read complete");
        Ok(collected.freeze())
    }

    /// Close the connection.
    ///
    /// Best-effort and idempotent: errors from an already broken transport
    /// are logged and swallowed, and later calls do nothing.
    pub async fn close(&mut self) {
        if self.state == AdapterState::Closed {
            return;
        }
        self.state = AdapterState::Closed;
        self.buffer.clear();

        let stats = self.transport.stats();
        debug!(
            transport = %self.transport.transport_type(),
            bytes_sent = stats.bytes_sent,
            bytes_received = stats.bytes_received,
            frames_received = stats.frames_received,
            errors = stats.errors,
            uptime_secs = stats.uptime_secs,
            "closing"
        );

        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "ignoring error while closing transport");
        }
    }
}
