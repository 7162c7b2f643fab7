//! Transport and monitor behavior against a local fake control server.

mod common;

use ftg_control::{
    DaemonAction, DashboardMonitor, HealthState, LogMonitor, MemoryBackend, TransportError,
    CONTROL_TOKEN_ENTRY, DEFAULT_CONTROL_TOKEN,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_health_reports_daemon_state() {
    let (daemon, t) = common::start().await;
    daemon.running.store(true, Ordering::SeqCst);

    let health = t.client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.ftg_status, "running");
}

#[tokio::test]
async fn test_http_500_is_status_error_and_publishes_error_health() {
    let (daemon, t) = common::start().await;
    daemon.healthy.store(false, Ordering::SeqCst);

    let err = t.client.health().await.unwrap_err();
    assert_eq!(err, TransportError::HttpStatus(500));

    let monitor = DashboardMonitor::new(Arc::clone(&t.client));
    assert!(monitor.refresh().await.is_err());
    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.health, HealthState::error());
    assert_eq!(snapshot.health.status, "error");
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn test_non_json_success_body_is_decode_error() {
    let (daemon, t) = common::start().await;
    daemon.garbled_health.store(true, Ordering::SeqCst);

    match t.client.health().await {
        Err(TransportError::Decode(_)) => {}
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_polled_health_falls_back_to_error_unknown() {
    let (daemon, t) = common::start().await;
    let monitor = DashboardMonitor::new(Arc::clone(&t.client));
    let mut rx = monitor.subscribe();

    monitor.start_polling(Duration::from_millis(40));
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.health.status == "ok"))
        .await
        .unwrap()
        .unwrap();

    daemon.healthy.store(false, Ordering::SeqCst);
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.health.status != "ok"))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    monitor.stop_polling();

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.health.status, "error");
    assert_eq!(snapshot.health.ftg_status, "unknown");
    assert_eq!(snapshot.health, HealthState::error());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let t = common::client_for(&url, MemoryBackend::new());

    match t.client.health().await {
        Err(TransportError::Network(_)) => {}
        other => panic!("expected network error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_exec_times_out_as_network_error() {
    let (daemon, t) = common::start().await;
    daemon.exec_delay_ms.store(500, Ordering::SeqCst);

    let res = t
        .client
        .exec(DaemonAction::Restart, Some(Duration::from_millis(100)))
        .await;
    assert!(matches!(res, Err(TransportError::Network(_))));
}

#[tokio::test]
async fn test_default_token_sent_when_nothing_stored() {
    let (daemon, t) = common::start().await;
    t.client.health().await.unwrap();

    let tokens = daemon.tokens_seen.lock().unwrap().clone();
    assert_eq!(tokens, vec![DEFAULT_CONTROL_TOKEN.to_string()]);
}

#[tokio::test]
async fn test_saved_token_used_on_next_request() {
    let daemon = Arc::new(common::FakeDaemon::default());
    let url = common::spawn(Arc::clone(&daemon)).await;
    let t = common::client_for(
        &url,
        MemoryBackend::new().with_entry(CONTROL_TOKEN_ENTRY, "from-keychain"),
    );

    t.client.health().await.unwrap();
    t.credentials.save("rotated").unwrap();
    t.client.health().await.unwrap();

    let tokens = daemon.tokens_seen.lock().unwrap().clone();
    assert_eq!(tokens, vec!["from-keychain".to_string(), "rotated".to_string()]);
}

#[tokio::test]
async fn test_exec_status_reports_running() {
    let (daemon, t) = common::start().await;
    daemon.running.store(true, Ordering::SeqCst);

    let res = t.client.exec(DaemonAction::Status, None).await.unwrap();
    assert_eq!(res.ok, Some(true));
    assert_eq!(res.running, Some(true));
    assert_eq!(daemon.exec_count("status"), 1);
}

#[tokio::test]
async fn test_chat_and_send_message_return_raw_body() {
    let (daemon, t) = common::start().await;

    let reply = t.client.llm_chat("ping").await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(parsed["reply"], json!("echo: ping"));

    let sent = t.client.send_message("@me", "hello").await.unwrap();
    assert!(sent.contains("\"ok\""));
    assert_eq!(
        daemon.last_body("/send_message"),
        Some(json!({"chat": "@me", "text": "hello"}))
    );
}

#[tokio::test]
async fn test_providers_listed() {
    let (_daemon, t) = common::start().await;
    let providers = t.client.llm_providers().await.unwrap();
    assert_eq!(providers.len(), 2);
    assert_eq!(providers[0].id, "lmstudio");
    assert_eq!(providers[1].base_url, "https://api.groq.com/openai/v1");
}

#[tokio::test]
async fn test_dashboard_refresh_publishes_snapshot() {
    let (daemon, t) = common::start().await;
    daemon.running.store(true, Ordering::SeqCst);
    let monitor = DashboardMonitor::new(Arc::clone(&t.client));
    let mut rx = monitor.subscribe();

    monitor.refresh().await.unwrap();
    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.health.ftg_status, "running");
    assert!(snapshot.running);
    assert_eq!(snapshot.last_error, None);
}

#[tokio::test]
async fn test_dashboard_polling_stops_on_request() {
    let (daemon, t) = common::start().await;
    let monitor = DashboardMonitor::new(Arc::clone(&t.client));

    monitor.start_polling(Duration::from_millis(50));
    assert!(monitor.is_polling());
    tokio::time::sleep(Duration::from_millis(180)).await;
    monitor.stop_polling();
    assert!(!monitor.is_polling());

    let seen = daemon.exec_count("status");
    assert!(seen >= 2, "expected several polls, saw {seen}");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(daemon.exec_count("status") <= seen + 1);
}

#[tokio::test]
async fn test_dashboard_shutdown_joins_poll_loop() {
    let (daemon, t) = common::start().await;
    let monitor = DashboardMonitor::new(Arc::clone(&t.client));

    monitor.start_polling(Duration::from_millis(30));
    tokio::time::sleep(Duration::from_millis(100)).await;
    monitor.shutdown().await;
    assert!(!monitor.is_polling());

    let seen = daemon.exec_count("status");
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(daemon.exec_count("status"), seen);
}

#[tokio::test]
async fn test_log_tail_and_error_line() {
    let (daemon, t) = common::start().await;
    let logs = LogMonitor::new(Arc::clone(&t.client), 3);

    logs.refresh().await;
    assert_eq!(logs.lines(), vec!["line 3", "line 4", "line 5"]);
    assert_eq!(logs.joined(), "line 3\nline 4\nline 5");

    let dead = common::client_for("http://127.0.0.1:9", MemoryBackend::new());
    let failing = LogMonitor::new(Arc::clone(&dead.client), 3);
    failing.refresh().await;
    let lines = failing.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Error: "));

    daemon.log_lines.lock().unwrap().push("line 6".to_string());
    logs.set_auto_refresh(true, Duration::from_millis(30));
    assert!(logs.auto_refresh());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(logs.lines().last().map(String::as_str), Some("line 6"));
    logs.set_auto_refresh(false, Duration::from_millis(30));
    assert!(!logs.auto_refresh());
}
