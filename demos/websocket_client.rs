//! WebSocket console example
//!
//! Wakes a device behind a WebSocket bridge, runs one command and prints
//! the reply lines.
//!
//! Usage:
//!   cargo run --example websocket_client -- 192.168.0.57 i

use wsterm_core::{Console, ConsoleConfig, FramedLineAdapter, ReaderConfig, WebSocketConfig, WebSocketTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let (host, command) = match args.len() {
        3 => (args[1].clone(), args[2].clone()),
        2 => (args[1].clone(), "i".to_string()),
        _ => {
            println!("Usage: websocket_client <host> [command]");
            println!("Example: websocket_client 192.168.0.57 i");
            return Ok(());
        }
    };

    let config = WebSocketConfig::new(&host);
    println!("Connecting to {}...", config.url());

    let adapter = FramedLineAdapter::open(WebSocketTransport::new(config), ReaderConfig::default()).await?;
    let mut console = Console::new(adapter, ConsoleConfig::default());

    console.wake().await?;
    for line in console.command(&command).await? {
        println!("{line}");
    }

    console.close().await;
    Ok(())
}
