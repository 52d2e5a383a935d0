//! wsterm CLI - Command-line interface
//!
//! Drives an interactive command-line device over a WebSocket: send
//! commands, read their responses line by line, stream output, or capture
//! raw bytes.

use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wsterm_core::cli::{
    format_bytes, format_lines, init_tracing, print_exit_codes, CliResult, ExitCodes, OutputFormat,
};
use wsterm_core::config::{log_dir, AppConfig, ConnectionProfile};
use wsterm_core::core::buffer::{decode_lossy, is_prompt};
use wsterm_core::core::logger::{generate_log_filename, LogFormat, SessionLogger};
use wsterm_core::{
    Console, ConsoleConfig, DeviceTemplates, FrameTransport, FramedLineAdapter, WebSocketConfig,
    WebSocketTransport,
};

/// wsterm CLI
#[derive(Parser, Debug)]
#[command(
    name = "wsterm",
    version,
    about = "Line-oriented terminal for command-line devices over WebSocket",
    long_about = None
)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "WSTERM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Capture the session (`--capture=<file>`, or a timestamped file in the
    /// log directory when no file is given)
    #[arg(long, global = true, num_args = 0..=1, require_equals = true)]
    capture: Option<Option<PathBuf>>,

    /// Capture format (text, hex, json)
    #[arg(long, global = true)]
    capture_format: Option<String>,

    /// Talk to a built-in simulated console instead of a device
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Connection selection
#[derive(Args, Debug, Clone, Default)]
struct ConnectArgs {
    /// Device host or IP address
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// WebSocket port
    #[arg(short, long)]
    port: Option<u16>,

    /// WebSocket path
    #[arg(long)]
    path: Option<String>,

    /// Saved connection profile
    #[arg(short = 'P', long)]
    profile: Option<String>,

    /// Wake the device before the first command (overrides the profile
    /// and config `wake_on_connect`)
    #[arg(short, long)]
    wake: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a command and print its response
    Exec {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Command to send
        #[arg(short = 'c', long)]
        command: String,

        /// Echoed lines to skip (defaults to the console setting)
        #[arg(long)]
        skip: Option<usize>,

        /// Silence that ends the response, in seconds
        #[arg(short, long, value_parser = parse_seconds)]
        timeout: Option<Duration>,

        /// Keep reading until silence and drop every prompt line
        #[arg(long)]
        all: bool,
    },

    /// Stream device output line by line until Ctrl+C
    Listen {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Command that starts the output
        #[arg(short = 'c', long)]
        command: Option<String>,

        /// Echoed lines to skip after the command
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Stop after this many seconds
        #[arg(long, value_parser = parse_seconds)]
        duration: Option<Duration>,
    },

    /// Capture raw bytes until the device goes quiet
    Raw {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Command that starts the output
        #[arg(short = 'c', long)]
        command: Option<String>,

        /// Echoed lines to skip after the command
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Silence that ends the capture, in seconds
        #[arg(short, long, default_value = "0.5", value_parser = parse_seconds)]
        silence: Duration,

        /// Stop after this many bytes
        #[arg(short, long)]
        max_bytes: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version and environment information
    Info,

    /// List exit codes
    ExitCodes,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("not a number of seconds: {value}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {value}: {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = match cli.config.clone().map_or_else(AppConfig::default_path, Ok) {
        Ok(path) => path,
        Err(e) => return report(&cli, &CliResult::error(ExitCodes::CONFIG_ERROR, e.to_string())),
    };
    let config = match AppConfig::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => return report(&cli, &CliResult::error(ExitCodes::CONFIG_ERROR, e.to_string())),
    };

    let _log_guard = match init_tracing(&config.logging, cli.verbose, cli.quiet) {
        Ok(guard) => guard,
        Err(e) => return report(&cli, &CliResult::error(ExitCodes::CONFIG_ERROR, e.to_string())),
    };

    tracing::debug!(config = %config_path.display(), "starting wsterm v{}", wsterm_core::VERSION);

    match run(&cli, config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&cli, &CliResult::from_error(&e)),
    }
}

fn report(cli: &Cli, result: &CliResult) -> ExitCode {
    if let Some(msg) = result.message() {
        if result.is_success() {
            if !cli.quiet {
                eprintln!("{msg}");
            }
        } else {
            eprintln!("Error: {msg}");
        }
    }
    result.to_exit_code()
}

async fn run(cli: &Cli, config: AppConfig, config_path: &Path) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Exec {
            connect,
            command,
            skip,
            timeout,
            all,
        } => exec(cli, &config, connect, command, *skip, *timeout, *all).await,
        Commands::Listen {
            connect,
            command,
            skip,
            duration,
        } => listen(cli, &config, connect, command.as_deref(), *skip, *duration).await,
        Commands::Raw {
            connect,
            command,
            skip,
            silence,
            max_bytes,
        } => raw(cli, &config, connect, command.as_deref(), *skip, *silence, *max_bytes).await,
        Commands::Config { action } => handle_config(cli, &config, config_path, action),
        Commands::Info => show_info(cli, config_path),
        Commands::ExitCodes => {
            print_exit_codes();
            Ok(())
        }
    }
}

/// Effective connection and console settings after profile and flags
fn resolve_connection(
    config: &AppConfig,
    args: &ConnectArgs,
) -> anyhow::Result<(WebSocketConfig, ConsoleConfig)> {
    let (mut connection, mut console) = match &args.profile {
        Some(name) => {
            let ConnectionProfile {
                connection, console, ..
            } = config.profile(name)?.clone();
            (connection, console.unwrap_or_else(|| config.console.clone()))
        }
        None => (config.connection.clone(), config.console.clone()),
    };

    if let Some(host) = &args.host {
        connection.host.clone_from(host);
    }
    if let Some(port) = args.port {
        connection.port = port;
    }
    if let Some(path) = &args.path {
        connection.path.clone_from(path);
    }
    if args.wake {
        console.wake_on_connect = true;
    }

    Ok((connection, console))
}

async fn open_console(
    cli: &Cli,
    config: &AppConfig,
    args: &ConnectArgs,
    capture: &mut Option<SessionLogger>,
) -> anyhow::Result<Console<Box<dyn FrameTransport>>> {
    let (connection, console_config) = resolve_connection(config, args)?;

    let transport: Box<dyn FrameTransport> = if cli.simulate {
        Box::new(DeviceTemplates::demo_console())
    } else {
        Box::new(WebSocketTransport::new(connection))
    };

    if !cli.quiet {
        eprintln!("Connecting to {}...", transport.connection_info());
    }

    let adapter = FramedLineAdapter::open(transport, config.reader.clone()).await?;
    if let Some(logger) = capture {
        logger.log_info(&format!("connected to {}", adapter.transport().connection_info()))?;
    }
    let mut console = Console::new(adapter, console_config);

    if console.config().wake_on_connect {
        console.wake().await?;
    } else {
        console.adapter_mut().flush().await?;
    }

    Ok(console)
}

fn open_capture(cli: &Cli, config: &AppConfig) -> anyhow::Result<Option<SessionLogger>> {
    let Some(requested) = &cli.capture else {
        return Ok(None);
    };
    let format = match &cli.capture_format {
        Some(name) => LogFormat::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown capture format: {name}"))?,
        None => config.logging.capture_format,
    };
    let path = match requested {
        Some(path) => path.clone(),
        None => {
            let dir = log_dir()
                .ok_or_else(|| anyhow::anyhow!("could not determine the log directory"))?;
            std::fs::create_dir_all(&dir)?;
            dir.join(generate_log_filename("wsterm", format))
        }
    };

    let mut logger = SessionLogger::create(&path, format)?;
    logger.set_timestamps(config.logging.capture_timestamps);
    if !cli.quiet {
        eprintln!("Capturing to {}", logger.path().display());
    }
    Ok(Some(logger))
}

async fn send_command(
    console: &mut Console<Box<dyn FrameTransport>>,
    capture: &mut Option<SessionLogger>,
    command: &str,
) -> anyhow::Result<()> {
    console.send(command).await?;
    if let Some(logger) = capture {
        logger.log_tx(command.as_bytes())?;
    }
    Ok(())
}

fn capture_lines(capture: &mut Option<SessionLogger>, lines: &[String]) -> anyhow::Result<()> {
    if let Some(logger) = capture {
        for line in lines {
            logger.log_rx(line.as_bytes())?;
        }
    }
    Ok(())
}

async fn exec(
    cli: &Cli,
    config: &AppConfig,
    args: &ConnectArgs,
    command: &str,
    skip: Option<usize>,
    timeout: Option<Duration>,
    all: bool,
) -> anyhow::Result<()> {
    let mut capture = open_capture(cli, config)?;
    let mut console = open_console(cli, config, args, &mut capture).await?;

    let skip = skip.unwrap_or(console.config().echo_lines);
    let timeout = timeout.unwrap_or_else(|| console.config().response_timeout());

    send_command(&mut console, &mut capture, command).await?;
    let lines = if all {
        console.clear_echoes(skip).await?;
        console.adapter_mut().receive_until_silence(timeout).await?
    } else {
        console.adapter_mut().receive_lines(skip, timeout).await?
    };
    capture_lines(&mut capture, &lines)?;

    if !lines.is_empty() {
        println!("{}", format_lines(&lines, cli.format));
    }

    console.close().await;
    Ok(())
}

async fn listen(
    cli: &Cli,
    config: &AppConfig,
    args: &ConnectArgs,
    command: Option<&str>,
    skip: usize,
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut capture = open_capture(cli, config)?;
    let mut console = open_console(cli, config, args, &mut capture).await?;

    if let Some(command) = command {
        send_command(&mut console, &mut capture, command).await?;
        console.wait().await;
        console.clear_echoes(skip).await?;
    }

    if !cli.quiet {
        eprintln!("Listening. Press Ctrl+C to stop.");
    }

    let stop_at = duration.map(|d| tokio::time::Instant::now() + d);
    let poll = config.reader.poll_interval() * 5;
    let marker = config.reader.prompt_marker;
    let mut stdout = io::stdout();

    while running.load(Ordering::SeqCst) {
        if stop_at.is_some_and(|t| tokio::time::Instant::now() >= t) {
            break;
        }

        let line = console.adapter_mut().read_line(poll).await?;
        let text = decode_lossy(&line);
        let text = text.trim();
        if text.is_empty() || is_prompt(text, marker) {
            continue;
        }

        let lines = [text.to_string()];
        capture_lines(&mut capture, &lines)?;
        writeln!(stdout, "{}", format_lines(&lines, cli.format))?;
        stdout.flush()?;
    }

    if !cli.quiet {
        eprintln!("Stopped.");
    }
    console.close().await;
    Ok(())
}

async fn raw(
    cli: &Cli,
    config: &AppConfig,
    args: &ConnectArgs,
    command: Option<&str>,
    skip: usize,
    silence: Duration,
    max_bytes: Option<usize>,
) -> anyhow::Result<()> {
    let mut capture = open_capture(cli, config)?;
    let mut console = open_console(cli, config, args, &mut capture).await?;

    if let Some(command) = command {
        send_command(&mut console, &mut capture, command).await?;
        console.clear_echoes(skip).await?;
    }

    let data = console.adapter_mut().receive_raw(silence, max_bytes).await?;
    if let Some(logger) = &mut capture {
        logger.log_rx(&data)?;
    }

    let mut stdout = io::stdout();
    match cli.format {
        OutputFormat::Text => stdout.write_all(&data)?,
        format => writeln!(stdout, "{}", format_bytes(&data, format))?,
    }
    stdout.flush()?;

    if !cli.quiet {
        eprintln!("{} bytes received", data.len());
    }
    console.close().await;
    Ok(())
}

fn handle_config(
    cli: &Cli,
    config: &AppConfig,
    config_path: &Path,
    action: &ConfigAction,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
            _ => print!("{}", config.to_toml()?),
        },
        ConfigAction::Path => println!("{}", config_path.display()),
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            AppConfig::default().save_to(config_path)?;
            if !cli.quiet {
                eprintln!("Wrote {}", config_path.display());
            }
        }
    }
    Ok(())
}

fn show_info(cli: &Cli, config_path: &Path) -> anyhow::Result<()> {
    let info = serde_json::json!({
        "name": wsterm_core::NAME,
        "version": wsterm_core::VERSION,
        "transports": ["websocket", "simulated"],
        "config": config_path.display().to_string(),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH
    });

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        _ => {
            println!("wsterm v{}", wsterm_core::VERSION);
            println!("Platform: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
            println!("Config: {}", config_path.display());
            println!();
            println!("Transports:");
            println!("  • WebSocket (ws://host[:port]/path)");
            println!("  • Simulated console (--simulate)");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("0.5").unwrap(), Duration::from_millis(500));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn test_cli_parses_exec() {
        let cli = Cli::try_parse_from([
            "wsterm", "exec", "-H", "10.0.0.2", "-c", "i", "--timeout", "0.25",
        ])
        .unwrap();
        match cli.command {
            Commands::Exec {
                connect, command, timeout, ..
            } => {
                assert_eq!(connect.host.as_deref(), Some("10.0.0.2"));
                assert_eq!(command, "i");
                assert_eq!(timeout, Some(Duration::from_millis(250)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_profile() {
        let mut config = AppConfig::default();
        config
            .profiles
            .push(ConnectionProfile::websocket("lab", "192.168.0.57"));

        let args = ConnectArgs {
            profile: Some("lab".into()),
            port: Some(8080),
            ..ConnectArgs::default()
        };
        let (connection, console) = resolve_connection(&config, &args).unwrap();
        assert_eq!(connection.url(), "ws://192.168.0.57:8080/ws");
        assert_eq!(console, config.console);

        let args = ConnectArgs {
            profile: Some("missing".into()),
            ..ConnectArgs::default()
        };
        assert!(resolve_connection(&config, &args).is_err());
    }

    #[test]
    fn test_wake_falls_back_to_profile_then_config() {
        let mut config = AppConfig::default();
        let mut sleepy = ConnectionProfile::websocket("sleepy", "10.0.0.9");
        sleepy.console = Some(ConsoleConfig {
            wake_on_connect: true,
            ..ConsoleConfig::default()
        });
        config.profiles.push(sleepy);
        config.profiles.push(ConnectionProfile::websocket("plain", "10.0.0.8"));

        let profile = |name: &str, wake: bool| ConnectArgs {
            profile: Some(name.to_string()),
            wake,
            ..ConnectArgs::default()
        };

        let (_, console) = resolve_connection(&config, &profile("sleepy", false)).unwrap();
        assert!(console.wake_on_connect);
        let (_, console) = resolve_connection(&config, &profile("plain", false)).unwrap();
        assert!(!console.wake_on_connect);
        let (_, console) = resolve_connection(&config, &profile("plain", true)).unwrap();
        assert!(console.wake_on_connect);

        config.console.wake_on_connect = true;
        let (_, console) = resolve_connection(&config, &ConnectArgs::default()).unwrap();
        assert!(console.wake_on_connect);
    }

    #[test]
    fn test_capture_path_is_optional() {
        let cli = Cli::try_parse_from(["wsterm", "--capture", "info"]).unwrap();
        assert_eq!(cli.capture, Some(None));
        assert!(matches!(cli.command, Commands::Info));

        let cli = Cli::try_parse_from(["wsterm", "info", "--capture=session.log"]).unwrap();
        assert_eq!(cli.capture, Some(Some(PathBuf::from("session.log"))));

        let cli = Cli::try_parse_from(["wsterm", "info"]).unwrap();
        assert_eq!(cli.capture, None);
    }
}
