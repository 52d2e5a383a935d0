//! Diagnostic logging setup for the CLI

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Pick the filter directive: `-q` wins over `-v`, both win over config
pub fn filter_directive(config: &LoggingConfig, verbose: bool, quiet: bool) -> String {
    if quiet {
        "error".to_string()
    } else if verbose {
        "debug".to_string()
    } else {
        config.level.clone()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the computed filter. When logging to a file the
/// returned guard must be kept alive until exit so buffered lines get written.
pub fn init_tracing(
    config: &LoggingConfig,
    verbose: bool,
    quiet: bool,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config, verbose, quiet)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("log file path has no file name: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            if config.json {
                builder.json().with_writer(writer).try_init()
            } else {
                builder.with_ansi(false).with_writer(writer).try_init()
            }
            .map_err(anyhow::Error::msg)?;
            Ok(Some(guard))
        }
        None => {
            if config.json {
                builder.json().with_writer(std::io::stderr).try_init()
            } else {
                builder.with_writer(std::io::stderr).try_init()
            }
            .map_err(anyhow::Error::msg)?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_precedence() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(&config, false, false), "warn");
        assert_eq!(filter_directive(&config, true, false), "debug");
        assert_eq!(filter_directive(&config, true, true), "error");
    }
}
