//! # wsterm Core Library
//!
//! Line-oriented access to interactive command-line devices reachable over
//! frame-based connections such as WebSockets.
//!
//! ## Features
//!
//! - Reassembly of lines split across arbitrary frame boundaries
//! - Timeout- and silence-terminated reads that never fail on idle
//! - Echo suppression and prompt trimming for command/response consoles
//! - Byte-exact raw reads with an optional size limit
//! - Scripted device simulation for tests
//! - Session capture logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use wsterm_core::{FramedLineAdapter, ReaderConfig, WebSocketConfig, WebSocketTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = WebSocketTransport::new(WebSocketConfig::new("192.168.0.57"));
//!     let mut adapter = FramedLineAdapter::open(transport, ReaderConfig::default()).await?;
//!
//!     adapter.flush().await?;
//!     adapter.send("i\n").await?;
//!     for line in adapter.receive_lines(1, Duration::from_millis(500)).await? {
//!         println!("{line}");
//!     }
//!
//!     adapter.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes, OutputFormat};
pub use crate::config::{AppConfig, ConfigError, ConnectionProfile};
pub use crate::core::adapter::{AdapterState, FramedLineAdapter, ReaderConfig};
pub use crate::core::buffer::LineBuffer;
pub use crate::core::console::{Console, ConsoleConfig};
pub use crate::core::logger::{LogEntry, LogFormat, SessionLogger};
pub use crate::core::simulator::{DeviceTemplates, ResponseRule, ScriptedTransport};
pub use crate::core::transport::{
    Frame, FrameTransport, TimeoutGuard, TransportError, TransportType, WebSocketConfig,
    WebSocketTransport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
