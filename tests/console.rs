//! Console sessions against the simulated device

use std::time::Duration;
use wsterm_core::{
    Console, ConsoleConfig, DeviceTemplates, FramedLineAdapter, LogFormat, ReaderConfig,
    ResponseRule, ScriptedTransport, SessionLogger,
};

async fn demo() -> Console<ScriptedTransport> {
    let adapter = FramedLineAdapter::open(DeviceTemplates::demo_console(), ReaderConfig::default())
        .await
        .unwrap();
    Console::new(adapter, ConsoleConfig::default())
}

#[tokio::test(start_paused = true)]
async fn wake_then_command() {
    let mut console = demo().await;

    console.wake().await.unwrap();
    assert_eq!(console.adapter().buffered(), 0);
    assert_eq!(console.adapter().transport().sent().len(), 10);

    let lines = console.command("i").await.unwrap();
    assert_eq!(lines, vec!["Simulated device v1.0"]);
    assert_eq!(console.adapter().transport().sent().last().unwrap(), "i\n");
}

#[tokio::test(start_paused = true)]
async fn multi_line_reply_keeps_order() {
    let device = DeviceTemplates::console("HiZ>").with_rule(ResponseRule::new(
        "help",
        &["\r\nGeneral", " commands\r\n  i  info\r\n", "  v  volts\r\n"],
    ));
    let adapter = FramedLineAdapter::new(device, ReaderConfig::default());
    let mut console = Console::new(adapter, ConsoleConfig::default());

    let lines = console.command("help\r\n").await.unwrap();
    assert_eq!(lines, vec!["General commands", "i  info", "v  volts"]);
    assert_eq!(console.adapter().transport().sent(), ["help\r\n"]);
}

#[tokio::test(start_paused = true)]
async fn close_ends_the_session() {
    let mut console = demo().await;
    console.close().await;
    console.close().await;

    let adapter = console.into_adapter();
    assert!(!adapter.is_open());
    assert_eq!(adapter.transport().close_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn captured_exchange_is_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    let mut capture = SessionLogger::create(&path, LogFormat::JsonLines).unwrap();

    let mut console = demo().await;
    console.adapter_mut().flush().await.unwrap();
    console.send("i").await.unwrap();
    capture.log_tx(b"i").unwrap();
    for line in console
        .adapter_mut()
        .receive_lines(1, Duration::from_millis(500))
        .await
        .unwrap()
    {
        capture.log_rx(line.as_bytes()).unwrap();
    }
    drop(capture);

    let text = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["direction"], "Sent");
    assert_eq!(entries[1]["direction"], "Received");
}
