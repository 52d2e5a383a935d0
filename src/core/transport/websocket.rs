//! WebSocket transport implementation

use super::{Frame, FrameTransport, TransportError, TransportStats, TransportType};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Request path
    pub path: String,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Default receive timeout in milliseconds
    pub read_timeout_ms: u64,
}

impl WebSocketConfig {
    /// Create a new WebSocket configuration
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            port: 80,
            path: "/ws".to_string(),
            connect_timeout_secs: 10,
            read_timeout_ms: 1000,
        }
    }

    /// Set port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set request path
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Set default receive timeout
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Endpoint URL
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        if self.port == 80 {
            format!("ws://{}{}", self.host, path)
        } else {
            format!("ws://{}:{}{}", self.host, self.port, path)
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.host.trim().is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "host must not be empty".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(TransportError::InvalidConfiguration(
                "connect timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self::new("192.168.4.1")
    }
}

/// WebSocket transport
pub struct WebSocketTransport {
    config: WebSocketConfig,
    stream: Option<WsStream>,
    timeout: Option<Duration>,
    stats: TransportStats,
    connected_at: Option<Instant>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport
    pub fn new(config: WebSocketConfig) -> Self {
        let timeout = Some(Duration::from_millis(config.read_timeout_ms));
        Self {
            config,
            stream: None,
            timeout,
            stats: TransportStats::default(),
            connected_at: None,
        }
    }

    /// Connection configuration
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }

    async fn next_message(stream: &mut WsStream) -> Result<Frame, TransportError> {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => return Ok(Frame::Binary(data)),
                // tungstenite answers pings on its own while we keep reading
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Err(TransportError::Disconnected),
                Some(Err(e)) => return Err(TransportError::ReceiveError(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl FrameTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.config.validate()?;
        let url = self.config.url();
        tracing::debug!(%url, "connecting");

        let (stream, _) = tokio::time::timeout(
            Duration::from_secs(self.config.connect_timeout_secs),
            connect_async(url.as_str()),
        )
        .await
        .map_err(|_| TransportError::ConnectionFailed(format!("timed out connecting to {url}")))?
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        self.stream = Some(stream);
        self.connected_at = Some(Instant::now());
        self.stats = TransportStats::default();
        tracing::info!(%url, "connected");

        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    async fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, Self::next_message(stream))
                .await
                .unwrap_or(Err(TransportError::Timeout(limit))),
            None => Self::next_message(stream).await,
        };

        match &result {
            Ok(frame) => {
                self.stats.bytes_received += frame.len() as u64;
                self.stats.frames_received += 1;
            }
            Err(e) if !e.is_timeout() => self.stats.errors += 1,
            Err(_) => {}
        }

        result
    }

    async fn send_frame(&mut self, text: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(e) = stream.send(Message::Text(text.to_owned().into())).await {
            self.stats.errors += 1;
            return Err(TransportError::SendError(e.to_string()));
        }

        self.stats.bytes_sent += text.len() as u64;
        self.stats.frames_sent += 1;

        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .close(None)
                .await
                .map_err(|e| TransportError::IoError(std::io::Error::other(e.to_string())))?;
        }
        self.connected_at = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    fn connection_info(&self) -> String {
        self.config.url()
    }

    fn stats(&self) -> TransportStats {
        let mut stats = self.stats.clone();
        if let Some(connected_at) = self.connected_at {
            stats.uptime_secs = connected_at.elapsed().as_secs();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        assert_eq!(WebSocketConfig::new("192.168.0.57").url(), "ws://192.168.0.57/ws");
        assert_eq!(
            WebSocketConfig::new("localhost").port(8080).path("term").url(),
            "ws://localhost:8080/term"
        );
    }

    #[test]
    fn test_validate() {
        assert!(WebSocketConfig::new("host").validate().is_ok());
        assert!(WebSocketConfig::new("  ").validate().is_err());
    }

    #[test]
    fn test_read_timeout_becomes_transport_default() {
        let config = WebSocketConfig::new("host").read_timeout(Duration::from_millis(250));
        let transport = WebSocketTransport::new(config);
        assert_eq!(transport.timeout(), Some(Duration::from_millis(250)));
        assert!(!transport.is_connected());
        assert_eq!(transport.transport_type(), TransportType::WebSocket);
        assert_eq!(transport.stats().uptime_secs, 0);
    }

    #[tokio::test]
    async fn test_receive_requires_connection() {
        let mut transport = WebSocketTransport::new(WebSocketConfig::new("host"));
        assert!(matches!(
            transport.receive_frame().await,
            Err(TransportError::NotConnected)
        ));
        // Closing an unopened transport is a no-op
        assert!(transport.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = WebSocketConfig::new("127.0.0.1").port(port);
        let mut transport = WebSocketTransport::new(config);
        assert!(matches!(
            transport.connect().await,
            Err(TransportError::ConnectionFailed(_))
        ));
    }
}
