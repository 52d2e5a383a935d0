//! Scripted Device Simulator
//!
//! An in-memory [`FrameTransport`] that replays timed frames and behaves like
//! a simple interactive console: it can echo commands back, answer known
//! commands and print a prompt. Timing uses `tokio::time`, so tests can run
//! it under a paused clock.

use super::transport::{Frame, FrameTransport, TransportError, TransportStats, TransportType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Scheduled transport event
#[derive(Debug, Clone)]
enum Event {
    Frame(Frame),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Pending {
    at: Instant,
    event: Event,
}

/// Reply rule for a command sent to the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRule {
    /// Command text, compared after trimming whitespace
    pub command: String,
    /// Frames sent back, in order
    pub reply: Vec<String>,
}

impl ResponseRule {
    /// Create a rule answering `command` with `reply` frames
    pub fn new(command: &str, reply: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            reply: reply.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Check whether a sent frame triggers this rule
    pub fn matches(&self, sent: &str) -> bool {
        sent.trim() == self.command
    }
}

/// Frame transport driven by a script
pub struct ScriptedTransport {
    name: String,
    pending: VecDeque<Pending>,
    cursor: Instant,
    timeout: Option<Duration>,
    echo: bool,
    prompt: Option<String>,
    reply_delay: Duration,
    rules: Vec<ResponseRule>,
    sent: Vec<String>,
    connected: bool,
    fail_close: bool,
    close_calls: usize,
    stats: TransportStats,
}

impl ScriptedTransport {
    /// Create an empty, connected script.
    ///
    /// Frame delays are measured from this call, each relative to the
    /// previous scripted frame.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pending: VecDeque::new(),
            cursor: Instant::now(),
            timeout: Some(Duration::from_secs(1)),
            echo: false,
            prompt: None,
            reply_delay: Duration::from_millis(5),
            rules: Vec::new(),
            sent: Vec::new(),
            connected: true,
            fail_close: false,
            close_calls: 0,
            stats: TransportStats::default(),
        }
    }

    /// Deliver `frame` after `delay`
    #[must_use]
    pub fn then(mut self, delay: Duration, frame: impl Into<Frame>) -> Self {
        self.cursor += delay;
        let at = self.cursor;
        self.schedule(at, Event::Frame(frame.into()));
        self
    }

    /// Fail the next receive after `delay` with a transport error
    #[must_use]
    pub fn then_fail(mut self, delay: Duration, reason: &str) -> Self {
        self.cursor += delay;
        let at = self.cursor;
        self.schedule(at, Event::Fail(reason.to_string()));
        self
    }

    /// Echo every sent frame back
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Print `prompt` after each command
    #[must_use]
    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = Some(prompt.to_string());
        self
    }

    /// Answer a command
    #[must_use]
    pub fn with_rule(mut self, rule: ResponseRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Delay between receiving a command and answering it
    #[must_use]
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Initial receive timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make `close` report an error
    #[must_use]
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Frames sent so far
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Scripted frames not yet delivered, including future ones
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Number of times `close` was called
    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    fn schedule(&mut self, at: Instant, event: Event) {
        let pos = self
            .pending
            .iter()
            .position(|p| p.at > at)
            .unwrap_or(self.pending.len());
        self.pending.insert(pos, Pending { at, event });
    }
}

#[async_trait]
impl FrameTransport for ScriptedTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    async fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        loop {
            let now = Instant::now();
            let Some(next_at) = self.pending.front().map(|p| p.at) else {
                return match self.timeout {
                    Some(limit) => {
                        tokio::time::sleep(limit).await;
                        Err(TransportError::Timeout(limit))
                    }
                    None => std::future::pending().await,
                };
            };

            if next_at <= now {
                let Some(Pending { event, .. }) = self.pending.pop_front() else {
                    continue;
                };
                return match event {
                    Event::Frame(frame) => {
                        self.stats.bytes_received += frame.len() as u64;
                        self.stats.frames_received += 1;
                        Ok(frame)
                    }
                    Event::Fail(reason) => {
                        self.stats.errors += 1;
                        Err(TransportError::ReceiveError(reason))
                    }
                };
            }

            match self.timeout {
                Some(limit) if now + limit < next_at => {
                    tokio::time::sleep(limit).await;
                    return Err(TransportError::Timeout(limit));
                }
                _ => tokio::time::sleep_until(next_at).await,
            }
        }
    }

    async fn send_frame(&mut self, text: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        self.sent.push(text.to_string());
        self.stats.bytes_sent += text.len() as u64;
        self.stats.frames_sent += 1;

        let at = Instant::now() + self.reply_delay;
        if self.echo {
            self.schedule(at, Event::Frame(Frame::Text(text.to_string())));
        }
        let replies: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(text))
            .flat_map(|rule| rule.reply.iter().cloned())
            .collect();
        for reply in replies {
            self.schedule(at, Event::Frame(Frame::Text(reply)));
        }
        if let Some(prompt) = self.prompt.clone() {
            self.schedule(at, Event::Frame(Frame::Text(prompt)));
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.close_calls += 1;
        let was_connected = std::mem::replace(&mut self.connected, false);
        if self.fail_close || !was_connected {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Scripted
    }

    fn connection_info(&self) -> String {
        format!("scripted:{}", self.name)
    }

    fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

/// Predefined device templates
pub struct DeviceTemplates;

impl DeviceTemplates {
    /// Echoing console that prints `prompt` after every command
    pub fn console(prompt: &str) -> ScriptedTransport {
        ScriptedTransport::new("console")
            .with_echo(true)
            .with_prompt(&format!("\r\n{prompt} "))
    }

    /// Console answering a couple of common commands, used by `--simulate`
    pub fn demo_console() -> ScriptedTransport {
        Self::console("HiZ>")
            .then(Duration::from_millis(10), "Welcome to the simulated console\r\n")
            .with_rule(ResponseRule::new(
                "help",
                &["\r\nGeneral commands\r\n", "  i      Version/status info\r\n", "  help   This list\r\n"],
            ))
            .with_rule(ResponseRule::new("i", &["\r\nSimulated device v1.0\r\n"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_arrive_on_schedule() {
        let mut device = ScriptedTransport::new("t")
            .then(ms(100), "a")
            .then(ms(100), "b")
            .with_timeout(Some(ms(50)));

        assert!(device.receive_frame().await.unwrap_err().is_timeout());
        assert_eq!(device.receive_frame().await.unwrap(), Frame::from("a"));

        device.set_timeout(Some(ms(500)));
        assert_eq!(device.receive_frame().await.unwrap(), Frame::from("b"));
        assert!(device.receive_frame().await.unwrap_err().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_echo_and_rules() {
        let mut device = ScriptedTransport::new("t")
            .with_echo(true)
            .with_rule(ResponseRule::new("AT", &["OK\n"]));

        device.send_frame("AT\n").await.unwrap();
        assert_eq!(device.receive_frame().await.unwrap(), Frame::from("AT\n"));
        assert_eq!(device.receive_frame().await.unwrap(), Frame::from("OK\n"));
        assert_eq!(device.sent(), ["AT\n".to_string()]);

        let stats = device.stats();
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.bytes_received, 6);
        assert_eq!(device.transport_type(), TransportType::Scripted);
        assert_eq!(device.connection_info(), "scripted:t");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_failure() {
        let mut device = ScriptedTransport::new("t").then_fail(ms(10), "link down");
        assert!(matches!(
            device.receive_frame().await,
            Err(TransportError::ReceiveError(_))
        ));
    }

    #[tokio::test]
    async fn test_close_reports_second_call() {
        let mut device = ScriptedTransport::new("t");
        assert!(device.close().await.is_ok());
        assert!(device.close().await.is_err());
        assert_eq!(device.close_calls(), 2);
        assert!(matches!(
            device.receive_frame().await,
            Err(TransportError::NotConnected)
        ));
    }
}
