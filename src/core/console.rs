//! Interactive console helpers
//!
//! Thin conveniences for driving a command-line device through a
//! [`FramedLineAdapter`]: line-terminated commands, settle delays, a wake
//! sequence and a send-then-collect command helper. The device's own
//! command vocabulary is opaque text here.

use super::adapter::FramedLineAdapter;
use super::transport::{FrameTransport, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Console behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Terminator appended to commands that lack one
    pub line_ending: String,
    /// Delay given to the device to process a command, in milliseconds
    pub settle_ms: u64,
    /// Commands sent first when waking the device (e.g. to leave a menu)
    pub wake_preamble: Vec<String>,
    /// Number of bare line endings sent when waking the device
    pub wake_newlines: usize,
    /// Echoed lines to skip after each command
    pub echo_lines: usize,
    /// Silence that ends a command response, in milliseconds
    pub response_timeout_ms: u64,
    /// Run the wake sequence right after connecting
    pub wake_on_connect: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            line_ending: "\n".to_string(),
            settle_ms: 300,
            wake_preamble: Vec::new(),
            wake_newlines: 10,
            echo_lines: 1,
            response_timeout_ms: 500,
            wake_on_connect: false,
        }
    }
}

impl ConsoleConfig {
    /// Settle delay
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Response silence timeout
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Command-line device session
pub struct Console<T: FrameTransport> {
    adapter: FramedLineAdapter<T>,
    config: ConsoleConfig,
}

impl<T: FrameTransport> Console<T> {
    /// Create a console on top of an adapter
    pub fn new(adapter: FramedLineAdapter<T>, config: ConsoleConfig) -> Self {
        Self { adapter, config }
    }

    /// Console settings
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Underlying adapter
    pub fn adapter(&self) -> &FramedLineAdapter<T> {
        &self.adapter
    }

    /// Underlying adapter, mutably
    pub fn adapter_mut(&mut self) -> &mut FramedLineAdapter<T> {
        &mut self.adapter
    }

    /// Give the adapter back
    pub fn into_adapter(self) -> FramedLineAdapter<T> {
        self.adapter
    }

    /// Send a command, appending the line ending if missing
    pub async fn send(&mut self, command: &str) -> Result<(), TransportError> {
        let ending = self.config.line_ending.as_str();
        if ending.is_empty() || command.ends_with(ending) {
            self.adapter.send(command).await
        } else {
            self.adapter.send(&format!("{command}{ending}")).await
        }
    }

    /// Let the device process what it was sent
    pub async fn wait(&self) {
        tokio::time::sleep(self.config.settle()).await;
    }

    /// Discard `count` echoed lines
    pub async fn clear_echoes(&mut self, count: usize) -> Result<(), TransportError> {
        self.adapter.clear_echoes(count).await
    }

    /// Bring the device to a fresh prompt and discard its output
    pub async fn wake(&mut self) -> Result<(), TransportError> {
        self.adapter.flush().await?;

        for command in self.config.wake_preamble.clone() {
            self.send(&command).await?;
            self.wait().await;
        }

        let ending = self.config.line_ending.clone();
        for _ in 0..self.config.wake_newlines {
            self.adapter.send(&ending).await?;
        }

        self.wait().await;
        self.adapter.flush().await?;
        debug!("console awake");
        Ok(())
    }

    /// Send a command and collect its response lines, echo removed
    pub async fn command(&mut self, command: &str) -> Result<Vec<String>, TransportError> {
        self.send(command).await?;
        let skip = self.config.echo_lines;
        let timeout = self.config.response_timeout();
        self.adapter.receive_lines(skip, timeout).await
    }

    /// Close the connection
    pub async fn close(&mut self) {
        self.adapter.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adapter::ReaderConfig;
    use crate::core::simulator::{DeviceTemplates, ResponseRule, ScriptedTransport};

    fn console(device: ScriptedTransport) -> Console<ScriptedTransport> {
        Console::new(
            FramedLineAdapter::new(device, ReaderConfig::default()),
            ConsoleConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_appends_line_ending() {
        let mut console = console(ScriptedTransport::new("t"));
        console.send("i").await.unwrap();
        console.send("help\n").await.unwrap();
        assert_eq!(console.adapter().transport().sent(), ["i\n", "help\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_strips_echo_and_prompt() {
        let device = DeviceTemplates::console("HiZ>")
            .with_rule(ResponseRule::new("i", &["Version 1.2\r\n", "Mode: HiZ\r\n"]));
        let mut console = console(device);

        let lines = console.command("i").await.unwrap();
        assert_eq!(lines, vec!["Version 1.2".to_string(), "Mode: HiZ".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wake_sends_preamble_and_newlines() {
        let device = ScriptedTransport::new("t")
            .with_echo(true)
            .then(Duration::from_millis(5), "stale banner\r\n");
        let config = ConsoleConfig {
            wake_preamble: vec!["n".to_string()],
            wake_newlines: 3,
            ..ConsoleConfig::default()
        };
        let mut console = Console::new(FramedLineAdapter::new(device, ReaderConfig::default()), config);

        console.wake().await.unwrap();

        let sent = console.adapter().transport().sent();
        assert_eq!(sent, ["n\n", "\n", "\n", "\n"]);
        assert_eq!(console.adapter_mut().bytes_available().await.unwrap(), 0);
    }
}
