//! Output formatting for received data

use clap::ValueEnum;

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format for scripting
    Json,
    /// Hex dump
    Hex,
    /// Text with control characters escaped
    Escaped,
}

/// Format received lines, one output line per entry
pub fn format_lines(lines: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({ "lines": lines }).to_string(),
        OutputFormat::Hex => lines
            .iter()
            .map(|line| hex_format(line.as_bytes()))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Escaped => lines
            .iter()
            .map(|line| escaped_format(line.as_bytes()))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Text => lines.join("\n"),
    }
}

/// Format raw bytes
pub fn format_bytes(data: &[u8], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({
            "data": String::from_utf8_lossy(data),
            "hex": hex::encode(data),
            "length": data.len()
        })
        .to_string(),
        OutputFormat::Hex => hex_format(data),
        OutputFormat::Escaped => escaped_format(data),
        OutputFormat::Text => String::from_utf8_lossy(data).into_owned(),
    }
}

fn hex_format(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escaped_format(data: &[u8]) -> String {
    data.iter()
        .map(|&b| match b {
            0x00 => "\\0".to_string(),
            0x07 => "\\a".to_string(),
            0x08 => "\\b".to_string(),
            0x09 => "\\t".to_string(),
            0x0a => "\\n".to_string(),
            0x0d => "\\r".to_string(),
            0x1b => "\\e".to_string(),
            0x20..=0x7e => (b as char).to_string(),
            _ => format!("\\x{b:02x}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_hex() {
        let data = &[0x48, 0x65, 0x6c, 0x6c, 0x6f];
        assert_eq!(format_bytes(data, OutputFormat::Hex), "48 65 6c 6c 6f");
    }

    #[test]
    fn test_output_format_escaped() {
        let data = b"Hello\r\n\x1b";
        assert_eq!(format_bytes(data, OutputFormat::Escaped), "Hello\\r\\n\\e");
    }

    #[test]
    fn test_lines_as_json() {
        let lines = vec!["OK".to_string(), "Mode: UART".to_string()];
        let json: serde_json::Value =
            serde_json::from_str(&format_lines(&lines, OutputFormat::Json)).unwrap();
        assert_eq!(json["lines"][1], "Mode: UART");
        assert_eq!(format_lines(&lines, OutputFormat::Text), "OK\nMode: UART");
    }
}
