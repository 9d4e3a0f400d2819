//! Integration tests for the spectator broadcaster, driven through its
//! public async handle.

use std::time::Duration;

use liku_registry::AgentId;
use liku_session::{SessionEvent, SessionId};
use liku_spectator::{spawn_broadcaster, BroadcastFrame, SpectatorConfig};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn fast_config() -> SpectatorConfig {
    SpectatorConfig { broadcast_interval: Duration::from_millis(10), ping_interval_ticks: 0, ..SpectatorConfig::tic_tac_toe() }
}

#[tokio::test]
async fn test_attach_receives_an_immediate_snapshot() {
    let (_events_tx, events_rx) = mpsc::unbounded_channel();
    let handle = spawn_broadcaster(SessionId::new(), fast_config(), json!({"board": [[null, null, null]]}), events_rx);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let agent = AgentId::new();
    handle.attach(agent, tx).await.unwrap();

    let frame = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(frame, BroadcastFrame::Snapshot(_)));
}

#[tokio::test]
async fn test_capacity_cap_rejects_further_attaches() {
    let mut config = fast_config();
    config.max_spectators = 1;
    let (_events_tx, events_rx) = mpsc::unbounded_channel();
    let handle = spawn_broadcaster(SessionId::new(), config, json!({}), events_rx);

    let (tx1, _rx1) = mpsc::unbounded_channel();
    handle.attach(AgentId::new(), tx1).await.unwrap();

    let (tx2, _rx2) = mpsc::unbounded_channel();
    let err = handle.attach(AgentId::new(), tx2).await.unwrap_err();
    assert!(matches!(err, liku_spectator::SpectatorError::CapacityExceeded));
}

#[tokio::test]
async fn test_move_made_is_patched_to_an_already_attached_spectator() {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let handle = spawn_broadcaster(SessionId::new(), fast_config(), json!({"board": [null, null, null]}), events_rx);

    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.attach(AgentId::new(), tx).await.unwrap();
    let _ = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();

    events_tx
        .send(SessionEvent::MoveMade {
            state: json!({"board": ["X", null, null]}),
            slot: "X".to_string(),
            move_number: 1,
            current_to_move: Some("O".to_string()),
        })
        .unwrap();

    let frame = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(frame, BroadcastFrame::Patch(_) | BroadcastFrame::Snapshot(_)));
}

#[tokio::test]
async fn test_ping_fires_on_the_configured_tick_cadence() {
    let config = SpectatorConfig { broadcast_interval: Duration::from_millis(10), ping_interval_ticks: 1, ..SpectatorConfig::tic_tac_toe() };
    let (_events_tx, events_rx) = mpsc::unbounded_channel();
    let handle = spawn_broadcaster(SessionId::new(), config, json!({}), events_rx);

    let (tx, mut rx) = mpsc::unbounded_channel();
    handle.attach(AgentId::new(), tx).await.unwrap();
    let _ = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap(); // initial snapshot

    let mut saw_ping = false;
    for _ in 0..5 {
        if let Ok(Some(frame)) = timeout(Duration::from_secs(1), rx.recv()).await {
            if matches!(frame, BroadcastFrame::Ping { .. }) {
                saw_ping = true;
                break;
            }
        }
    }
    assert!(saw_ping, "expected at least one ping frame from the tick-driven loop");
}

#[tokio::test]
async fn test_detach_removes_the_spectator_from_the_count() {
    let (_events_tx, events_rx) = mpsc::unbounded_channel();
    let handle = spawn_broadcaster(SessionId::new(), fast_config(), json!({}), events_rx);

    let (tx, _rx) = mpsc::unbounded_channel();
    let agent = AgentId::new();
    handle.attach(agent, tx).await.unwrap();
    assert_eq!(handle.spectator_count().await.unwrap(), 1);

    handle.detach(agent).await;
    assert_eq!(handle.spectator_count().await.unwrap(), 0);
}
