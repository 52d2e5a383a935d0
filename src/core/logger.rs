//! Session capture log
//!
//! Records what was sent to and received from the device, with timestamps,
//! in one of a few line-based formats.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Capture format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text
    #[default]
    Text,
    /// Hex dump
    Hex,
    /// JSON lines
    JsonLines,
}

impl LogFormat {
    /// Get file extension for format
    pub fn extension(&self) -> &'static str {
        match self {
            LogFormat::Text => "txt",
            LogFormat::Hex => "hex",
            LogFormat::JsonLines => "jsonl",
        }
    }

    /// Parse a format name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "hex" => Some(Self::Hex),
            "json" | "jsonl" | "jsonlines" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Data direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// From the device
    Received,
    /// To the device
    Sent,
    /// Annotation
    Info,
}

impl Direction {
    fn tag(self) -> &'static str {
        match self {
            Direction::Received => "RX",
            Direction::Sent => "TX",
            Direction::Info => "##",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Local>,
    /// Direction of the data
    pub direction: Direction,
    /// Payload
    pub data: Vec<u8>,
}

impl LogEntry {
    /// Create new entry
    pub fn new(direction: Direction, data: Vec<u8>) -> Self {
        Self {
            timestamp: Local::now(),
            direction,
            data,
        }
    }

    fn stamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }

    /// Format as text
    pub fn to_text(&self, show_timestamp: bool) -> String {
        let text = String::from_utf8_lossy(&self.data);
        let text = text.trim_end_matches(['\r', '\n']);
        if show_timestamp {
            format!("[{}] {} {}", self.stamp(), self.direction.tag(), text)
        } else {
            format!("{} {}", self.direction.tag(), text)
        }
    }

    /// Format as hex
    pub fn to_hex(&self, show_timestamp: bool) -> String {
        let hex = self
            .data
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        if show_timestamp {
            format!("[{}] {} {}", self.stamp(), self.direction.tag(), hex)
        } else {
            format!("{} {}", self.direction.tag(), hex)
        }
    }

    /// Format as JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Session logger
pub struct SessionLogger {
    file: BufWriter<File>,
    format: LogFormat,
    path: PathBuf,
    timestamps: bool,
    entries: usize,
}

impl SessionLogger {
    /// Start appending to `path`
    pub fn create(path: &Path, format: LogFormat) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: BufWriter::new(file),
            format,
            path: path.to_path_buf(),
            timestamps: true,
            entries: 0,
        })
    }

    /// Log file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set timestamp display
    pub fn set_timestamps(&mut self, show: bool) {
        self.timestamps = show;
    }

    /// Entries written so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Log data
    pub fn log(&mut self, direction: Direction, data: &[u8]) -> io::Result<()> {
        let entry = LogEntry::new(direction, data.to_vec());
        let line = match self.format {
            LogFormat::Text => entry.to_text(self.timestamps),
            LogFormat::Hex => entry.to_hex(self.timestamps),
            LogFormat::JsonLines => entry.to_json(),
        };
        writeln!(self.file, "{line}")?;
        self.entries += 1;
        Ok(())
    }

    /// Log received data
    pub fn log_rx(&mut self, data: &[u8]) -> io::Result<()> {
        self.log(Direction::Received, data)
    }

    /// Log sent data
    pub fn log_tx(&mut self, data: &[u8]) -> io::Result<()> {
        self.log(Direction::Sent, data)
    }

    /// Log info message
    pub fn log_info(&mut self, message: &str) -> io::Result<()> {
        self.log(Direction::Info, message.as_bytes())
    }

    /// Flush to disk
    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for SessionLogger {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}

/// Generate log filename with timestamp
pub fn generate_log_filename(prefix: &str, format: LogFormat) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{}_{}.{}", prefix, timestamp, format.extension())
}
