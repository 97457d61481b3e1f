// tests/warden_loop.rs
//! Integration tests for the warden's event loop: feed consumption, pacing
//! timers, keepalive and session backup.

mod common;
use common::{OPERATOR, config_with, message, nickname_changed, thread};
use nickwarden::lock::Warden;
use nickwarden::platform::{Call, RecordingClient};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test(start_paused = true)]
async fn test_run_loop_enforces_lock() {
    let client = Arc::new(RecordingClient::new().with_thread("T1", thread(None, &["A", "B"])));
    let (tx, rx) = mpsc::channel(16);
    let warden = Warden::new(&common::config(), client.clone());
    let handle = tokio::spawn(warden.run(rx));

    tx.send(message("T1", OPERATOR, "/nicklock on")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(client.renames().len(), 2);

    client.clear();
    tx.send(nickname_changed("T1", "B", "Eve")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        client.renames(),
        vec![("T1".to_string(), "B".to_string(), "🔒 Locked".to_string())]
    );

    drop(tx);
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_stops_when_feed_closes() {
    let client = Arc::new(RecordingClient::new());
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::spawn(Warden::new(&common::config(), client.clone()).run(rx));

    drop(tx);
    handle.await.unwrap();
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_keepalive_and_backup() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("appstate.json");
    let config = config_with(&format!(
        "[session]\npath = {:?}\n",
        session.to_string_lossy()
    ));

    let client = Arc::new(RecordingClient::new().with_thread("T1", thread(Some("Team"), &["A"])));
    client.set_app_state(json!([{ "key": "c_user", "value": "1" }]));
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(Warden::new(&config, client.clone()).run(rx));

    tx.send(message("T1", OPERATOR, "/gclock")).await.unwrap();

    // First keepalive fires after 300s; the indicator clears 1.5s later.
    tokio::time::sleep(Duration::from_secs(302)).await;
    let typing: Vec<Call> = client
        .calls()
        .into_iter()
        .map(|c| c.call)
        .filter(|c| matches!(c, Call::Typing { .. }))
        .collect();
    assert_eq!(
        typing,
        vec![
            Call::Typing { thread_id: "T1".to_string(), typing: true },
            Call::Typing { thread_id: "T1".to_string(), typing: false },
        ]
    );

    // First backup fires after 600s.
    tokio::time::sleep(Duration::from_secs(299)).await;
    assert!(client.calls().iter().any(|c| c.call == Call::AppState));

    drop(tx);
    handle.await.unwrap();

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&session).unwrap()).unwrap();
    assert_eq!(written, json!([{ "key": "c_user", "value": "1" }]));
}
