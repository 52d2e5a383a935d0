//! Transport layer for frame-based connections
//!
//! A transport delivers discrete frames whose boundaries have nothing to do
//! with the line structure of the text they carry. The line adapter on top
//! of this trait does the reassembly.
//!
//! Supports:
//! - WebSocket (`ws://host:port/path`)

mod websocket;

pub use websocket::{WebSocketConfig, WebSocketTransport};

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use thiserror::Error;

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// WebSocket client
    WebSocket,
    /// In-memory scripted device
    Scripted,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebSocket => write!(f, "WebSocket"),
            Self::Scripted => write!(f, "Scripted"),
        }
    }
}

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Nothing arrived within the configured receive timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// Disconnected
    #[error("Disconnected")]
    Disconnected,

    /// Send error
    #[error("Send error: {0}")]
    SendError(String),

    /// Receive error
    #[error("Receive error: {0}")]
    ReceiveError(String),
}

impl TransportError {
    /// Whether this error only means "no data right now"
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// A single unit of data delivered by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload
    Text(String),
    /// Binary payload
    Binary(Bytes),
}

impl Frame {
    /// Check if the payload carries no bytes
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Binary(data) => data.is_empty(),
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Raw byte representation (text frames as UTF-8)
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Binary(data) => data,
        }
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<&[u8]> for Frame {
    fn from(data: &[u8]) -> Self {
        Self::Binary(Bytes::copy_from_slice(data))
    }
}

/// Transport statistics
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    /// Bytes sent
    pub bytes_sent: u64,
    /// Bytes received
    pub bytes_received: u64,
    /// Frames sent
    pub frames_sent: u64,
    /// Frames received
    pub frames_received: u64,
    /// Errors count
    pub errors: u64,
    /// Connection uptime in seconds
    pub uptime_secs: u64,
}

/// Frame-based transport contract
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameTransport: Send {
    /// Connect to the target
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Current receive timeout (`None` blocks until a frame arrives)
    fn timeout(&self) -> Option<Duration>;

    /// Change the receive timeout
    fn set_timeout(&mut self, timeout: Option<Duration>);

    /// Receive the next frame.
    ///
    /// Fails with [`TransportError::Timeout`] when nothing arrives within the
    /// receive timeout. An empty frame means the far end had nothing to say.
    async fn receive_frame(&mut self) -> Result<Frame, TransportError>;

    /// Send one text frame
    async fn send_frame(&mut self, text: &str) -> Result<(), TransportError>;

    /// Release the connection. Safe to call more than once.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Get transport type
    fn transport_type(&self) -> TransportType;

    /// Get connection info string
    fn connection_info(&self) -> String;

    /// Get statistics
    fn stats(&self) -> TransportStats;
}

#[async_trait]
impl<T: FrameTransport + ?Sized> FrameTransport for Box<T> {
    async fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect().await
    }

    fn timeout(&self) -> Option<Duration> {
        (**self).timeout()
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        (**self).set_timeout(timeout);
    }

    async fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        (**self).receive_frame().await
    }

    async fn send_frame(&mut self, text: &str) -> Result<(), TransportError> {
        (**self).send_frame(text).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn transport_type(&self) -> TransportType {
        (**self).transport_type()
    }

    fn connection_info(&self) -> String {
        (**self).connection_info()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

/// Scoped receive-timeout override.
///
/// Sets the transport timeout on creation and puts the previous value back
/// when dropped, on every exit path including `?` returns and cancelled
/// futures.
pub struct TimeoutGuard<'a, T: FrameTransport + ?Sized> {
    transport: &'a mut T,
    previous: Option<Duration>,
}

impl<'a, T: FrameTransport + ?Sized> TimeoutGuard<'a, T> {
    /// Override the receive timeout until the guard is dropped
    pub fn new(transport: &'a mut T, timeout: Duration) -> Self {
        let previous = transport.timeout();
        transport.set_timeout(Some(timeout));
        Self { transport, previous }
    }

    /// Timeout that will be restored on drop
    pub fn previous(&self) -> Option<Duration> {
        self.previous
    }
}

impl<T: FrameTransport + ?Sized> Deref for TimeoutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: FrameTransport + ?Sized> DerefMut for TimeoutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: FrameTransport + ?Sized> Drop for TimeoutGuard<'_, T> {
    fn drop(&mut self) {
        self.transport.set_timeout(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_bytes() {
        let text = Frame::from("OK\n");
        assert_eq!(text.len(), 3);
        assert_eq!(&text.into_bytes()[..], b"OK\n");

        let binary = Frame::from(&[0x01u8, 0x02][..]);
        assert!(!binary.is_empty());
        assert_eq!(&binary.into_bytes()[..], &[0x01, 0x02]);

        assert!(Frame::Text(String::new()).is_empty());
    }

    #[test]
    fn test_timeout_classification() {
        assert!(TransportError::Timeout(Duration::from_millis(100)).is_timeout());
        assert!(!TransportError::Disconnected.is_timeout());
        assert!(!TransportError::ReceiveError("reset".into()).is_timeout());
    }

    #[test]
    fn test_timeout_guard_restores_previous() {
        let mut mock = MockFrameTransport::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_timeout()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(Some(Duration::from_secs(1)));
        mock.expect_set_timeout()
            .withf(|t| *t == Some(Duration::from_millis(50)))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        mock.expect_set_timeout()
            .withf(|t| *t == Some(Duration::from_secs(1)))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let guard = TimeoutGuard::new(&mut mock, Duration::from_millis(50));
        assert_eq!(guard.previous(), Some(Duration::from_secs(1)));
        drop(guard);
    }
}
