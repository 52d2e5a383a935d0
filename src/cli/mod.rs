//! CLI Module
//!
//! Provides command-line interface functionality including:
//! - Exit codes for automation
//! - Output formatting
//! - Diagnostic logging setup

pub mod exit_codes;
pub mod logging;
pub mod output;

pub use exit_codes::{exit_code_description, print_exit_codes, CliResult, ExitCodes};
pub use logging::init_tracing;
pub use output::{format_bytes, format_lines, OutputFormat};
