//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// Connection timeout
    pub const TIMEOUT: u8 = 4;

    /// File not found
    pub const FILE_NOT_FOUND: u8 = 6;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Connection dropped mid-session
    pub const DISCONNECTED: u8 = 9;

    /// Internal error
    pub const INTERNAL_ERROR: u8 = 127;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Connection could not be established
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::Error(ExitCodes::CONNECTION_FAILED, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to `ExitCode`
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Classify an error bubbling out of a command
    pub fn from_error(err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<TransportError>() {
            return Self::from(e);
        }
        if let Some(e) = err.downcast_ref::<ConfigError>() {
            return Self::Error(ExitCodes::CONFIG_ERROR, e.to_string());
        }
        if let Some(e) = err.downcast_ref::<std::io::Error>() {
            return Self::from(std::io::Error::new(e.kind(), e.to_string()));
        }
        Self::Error(ExitCodes::ERROR, format!("{err:#}"))
    }
}

impl From<&TransportError> for CliResult {
    fn from(err: &TransportError) -> Self {
        let code = match err {
            TransportError::ConnectionFailed(_) => ExitCodes::CONNECTION_FAILED,
            TransportError::Timeout(_) => ExitCodes::TIMEOUT,
            TransportError::InvalidConfiguration(_) => ExitCodes::CONFIG_ERROR,
            TransportError::NotConnected
            | TransportError::Disconnected
            | TransportError::SendError(_)
            | TransportError::ReceiveError(_) => ExitCodes::DISCONNECTED,
            TransportError::IoError(_) => ExitCodes::ERROR,
        };
        Self::Error(code, err.to_string())
    }
}

impl From<std::io::Error> for CliResult {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match err.kind() {
            ErrorKind::NotFound => ExitCodes::FILE_NOT_FOUND,
            ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
            ErrorKind::ConnectionRefused => ExitCodes::CONNECTION_FAILED,
            ErrorKind::TimedOut => ExitCodes::TIMEOUT,
            _ => ExitCodes::ERROR,
        };

        Self::Error(code, err.to_string())
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection failed",
        4 => "Connection timeout",
        6 => "File not found",
        7 => "Permission denied",
        8 => "Configuration error",
        9 => "Connection dropped",
        127 => "Internal error",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 4, 6, 7, 8, 9, 127] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::connection_failed("refused");
        assert!(!error.is_success());
        assert_eq!(error.code(), ExitCodes::CONNECTION_FAILED);
        assert_eq!(error.message(), Some("refused"));
    }

    #[test]
    fn test_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let result = CliResult::from(err);
        assert_eq!(result.code(), ExitCodes::FILE_NOT_FOUND);
    }

    #[test]
    fn test_from_transport_error() {
        let err = anyhow::Error::new(TransportError::Disconnected);
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::DISCONNECTED);

        let err = anyhow::Error::new(TransportError::Timeout(Duration::from_secs(1)));
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::TIMEOUT);

        let err = anyhow::anyhow!("something else");
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::ERROR);
    }

    #[test]
    fn test_from_config_error() {
        let err = anyhow::Error::new(ConfigError::UnknownProfile("lab".into()));
        assert_eq!(CliResult::from_error(&err).code(), ExitCodes::CONFIG_ERROR);
    }
}
