//! Integration tests for the Liku hub: handshake, heartbeat, matchmaking,
//! a full tic-tac-toe match, and chat, all driven over a real WebSocket
//! client against a [`dev_hub`].

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use liku::prelude::*;
use liku_protocol::{InboundEnvelope, InboundKind, OutboundEnvelope, OutboundKind};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

type ClientWs = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start_hub() -> String {
    let config = HubConfig { bind_addr: "127.0.0.1:0".into(), health_bind_addr: Some("127.0.0.1:0".into()), ..HubConfig::default() };
    let hub = dev_hub(config).await.expect("hub should build");
    let addr = hub.local_addr().expect("should have local addr").to_string();
    tokio::spawn(hub.run());
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str, token: &str, name: &str) -> ClientWs {
    let url = format!("ws://{addr}/?token={token}&name={name}");
    let (ws, _) = tokio_tungstenite::connect_async(url).await.expect("should connect");
    ws
}

fn inbound(kind: InboundKind, payload: Value) -> Message {
    let envelope = InboundEnvelope { kind, payload, request_id: None };
    Message::Text(serde_json::to_string(&envelope).expect("encode").into())
}

fn action(name: &str, mut extra: Value) -> Message {
    if let Some(obj) = extra.as_object_mut() {
        obj.insert("name".to_string(), json!(name));
    }
    inbound(InboundKind::Action, extra)
}

async fn recv(ws: &mut ClientWs) -> OutboundEnvelope {
    loop {
        match ws.next().await.expect("stream ended").expect("recv error") {
            Message::Text(text) => return serde_json::from_str(&text).expect("decode"),
            Message::Binary(bytes) => return serde_json::from_slice(&bytes).expect("decode"),
            _ => continue,
        }
    }
}

/// Keeps receiving until an envelope satisfies `pred`, or times out.
async fn recv_until(ws: &mut ClientWs, pred: impl Fn(&OutboundEnvelope) -> bool) -> OutboundEnvelope {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let env = recv(ws).await;
            if pred(&env) {
                return env;
            }
        }
    })
    .await
    .expect("timed out waiting for matching envelope")
}

async fn subscribe_all(ws: &mut ClientWs) {
    ws.send(inbound(InboundKind::Subscribe, json!({ "topic": "*" }))).await.expect("send subscribe");
    let ack = recv(ws).await;
    assert_eq!(ack.kind, OutboundKind::Ack);
}

#[tokio::test]
async fn test_welcome_is_sent_immediately_on_connect() {
    let addr = start_hub().await;
    let mut ws = connect(&addr, "alice-token", "Alice").await;

    let welcome = recv(&mut ws).await;
    assert_eq!(welcome.kind, OutboundKind::Welcome);
    assert_eq!(welcome.data["displayName"], "Alice");
    assert!(welcome.data["agentId"].as_str().is_some());
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let addr = start_hub().await;
    let mut ws = connect(&addr, "bob", "Bob").await;
    let _welcome = recv(&mut ws).await;

    ws.send(inbound(InboundKind::Ping, Value::Null)).await.expect("send ping");
    let pong = recv(&mut ws).await;
    assert_eq!(pong.kind, OutboundKind::Pong);
}

#[tokio::test]
async fn test_subscribe_without_topic_is_a_missing_field_error() {
    let addr = start_hub().await;
    let mut ws = connect(&addr, "carol", "Carol").await;
    let _welcome = recv(&mut ws).await;

    ws.send(inbound(InboundKind::Subscribe, json!({}))).await.expect("send");
    let err = recv(&mut ws).await;
    assert_eq!(err.kind, OutboundKind::Error);
    assert_eq!(err.data["kind"], "MISSING_FIELD");
}

#[tokio::test]
async fn test_unknown_action_is_rejected_with_the_valid_set() {
    let addr = start_hub().await;
    let mut ws = connect(&addr, "dave", "Dave").await;
    let _welcome = recv(&mut ws).await;

    ws.send(action("teleport", json!({}))).await.expect("send");
    let err = recv(&mut ws).await;
    assert_eq!(err.kind, OutboundKind::Error);
    assert_eq!(err.data["kind"], "INVALID_ACTION");
    assert!(err.data["message"].as_str().unwrap().contains("game_move"));
}

#[tokio::test]
async fn test_list_matches_is_empty_on_a_fresh_hub() {
    let addr = start_hub().await;
    let mut ws = connect(&addr, "erin", "Erin").await;
    let _welcome = recv(&mut ws).await;

    ws.send(action("list_matches", json!({}))).await.expect("send");
    let result = recv(&mut ws).await;
    assert_eq!(result.kind, OutboundKind::Result);
    assert!(result.data["matches"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_join_unknown_match_code_is_not_found() {
    let addr = start_hub().await;
    let mut ws = connect(&addr, "frank", "Frank").await;
    let _welcome = recv(&mut ws).await;

    ws.send(action("join_match", json!({ "code": "LIKU-NOPE" }))).await.expect("send");
    let err = recv(&mut ws).await;
    assert_eq!(err.kind, OutboundKind::Error);
    assert_eq!(err.data["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn test_cancelled_match_cannot_be_joined() {
    let addr = start_hub().await;
    let mut host = connect(&addr, "host-g", "HostG").await;
    let _welcome = recv(&mut host).await;

    host.send(action("host_game", json!({ "gameType": "tic_tac_toe" }))).await.expect("send");
    let hosted = recv(&mut host).await;
    let code = hosted.data["code"].as_str().unwrap().to_string();

    host.send(action("cancel_match", json!({ "code": code }))).await.expect("send");
    let cancelled = recv(&mut host).await;
    assert_eq!(cancelled.kind, OutboundKind::Result);
    assert_eq!(cancelled.data["event"], "cancelled");

    let mut guest = connect(&addr, "guest-g", "GuestG").await;
    let _welcome = recv(&mut guest).await;
    guest.send(action("join_match", json!({ "code": code }))).await.expect("send");
    let err = recv(&mut guest).await;
    assert_eq!(err.kind, OutboundKind::Error);
    assert_eq!(err.data["kind"], "NOT_FOUND");
}

/// Hosts a ticket on `host`, joins it from `guest`, and drains the
/// `matched` result plus every session event both sides pick up as a
/// result, returning host/guest slots and who moves first.
async fn host_and_match(host: &mut ClientWs, guest: &mut ClientWs) -> (String, String, String) {
    subscribe_all(host).await;
    subscribe_all(guest).await;

    host.send(action("host_game", json!({ "gameType": "tic_tac_toe" }))).await.expect("send");
    let hosted = recv(host).await;
    assert_eq!(hosted.data["event"], "hosted");
    let code = hosted.data["code"].as_str().unwrap().to_string();

    guest.send(action("join_match", json!({ "code": code }))).await.expect("send");
    let matched = recv_until(guest, |env| env.kind == OutboundKind::Result && env.data["event"] == "matched").await;
    let host_slot = matched.data["hostSlot"].as_str().unwrap().to_string();
    let guest_slot = matched.data["guestSlot"].as_str().unwrap().to_string();
    let starting_slot = matched.data["startingSlot"].as_str().unwrap().to_string();

    (host_slot, guest_slot, starting_slot)
}

/// Reads from `ws` until it sees the `move`-result state frame for
/// `move_number` — skipping any earlier `player_joined`/`game_started`
/// events its forwarder also delivered, regardless of arrival order.
async fn recv_move_state(ws: &mut ClientWs, move_number: u64) -> OutboundEnvelope {
    recv_until(ws, |env| env.kind == OutboundKind::State && env.data["moveNumber"].as_u64() == Some(move_number)).await
}

#[tokio::test]
async fn test_host_join_and_play_a_winning_game() {
    let addr = start_hub().await;
    let mut host = connect(&addr, "host-1", "Host").await;
    let _welcome = recv(&mut host).await;
    let mut guest = connect(&addr, "guest-1", "Guest").await;
    let _welcome = recv(&mut guest).await;

    let (host_slot, guest_slot, starting_slot) = host_and_match(&mut host, &mut guest).await;
    assert_ne!(host_slot, guest_slot);
    let (mut mover, mut other) = if host_slot == starting_slot { (host, guest) } else { (guest, host) };

    // The starting slot takes the top row for the win; the other side
    // replies off that line.
    let moves = [(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)];
    for (i, (row, col)) in moves.iter().enumerate() {
        mover.send(action("game_move", json!({ "move": { "row": row, "col": col } }))).await.expect("send move");
        let move_number = (i + 1) as u64;
        let state = recv_move_state(&mut mover, move_number).await;

        if i == moves.len() - 1 {
            assert!(state.data["outcome"].is_object(), "final move should report an outcome: {state:?}");
        } else {
            // The other side also observes the move via its forwarder, then
            // it becomes the mover for the next round.
            let _their_view = recv_move_state(&mut other, move_number).await;
            std::mem::swap(&mut mover, &mut other);
        }
    }
}

#[tokio::test]
async fn test_move_out_of_turn_is_rejected() {
    let addr = start_hub().await;
    let mut host = connect(&addr, "host-2", "Host2").await;
    let _welcome = recv(&mut host).await;
    let mut guest = connect(&addr, "guest-2", "Guest2").await;
    let _welcome = recv(&mut guest).await;

    let (host_slot, _guest_slot, starting_slot) = host_and_match(&mut host, &mut guest).await;
    let out_of_turn = if host_slot == starting_slot { &mut guest } else { &mut host };

    out_of_turn.send(action("game_move", json!({ "move": { "row": 0, "col": 0 } }))).await.expect("send");
    let err = recv_until(out_of_turn, |env| env.kind == OutboundKind::Error).await;
    assert_eq!(err.data["kind"], "NOT_YOUR_TURN");
}

#[tokio::test]
async fn test_chat_send_is_fanned_out_with_a_reusable_message_id() {
    let addr = start_hub().await;
    let mut host = connect(&addr, "host-3", "Host3").await;
    let _welcome = recv(&mut host).await;
    let mut guest = connect(&addr, "guest-3", "Guest3").await;
    let _welcome = recv(&mut guest).await;

    host_and_match(&mut host, &mut guest).await;

    host.send(action("chat_join", json!({}))).await.expect("send");
    let _ack = recv_until(&mut host, |env| env.kind == OutboundKind::Ack).await;
    guest.send(action("chat_join", json!({}))).await.expect("send");
    let _ack = recv_until(&mut guest, |env| env.kind == OutboundKind::Ack).await;
    // The host's connection also observes the guest's chat_join event.
    let _join_event = recv_until(&mut host, |env| env.data["event"] == "chat_join").await;

    host.send(action("chat_send", json!({ "content": "gg" }))).await.expect("send");
    let _ack = recv_until(&mut host, |env| env.kind == OutboundKind::Ack).await;

    let message = recv_until(&mut guest, |env| env.data["event"] == "chat_message").await;
    assert_eq!(message.data["content"], "gg");
    let message_id = message.data["messageId"].as_str().unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&message_id).is_ok());

    guest.send(action("chat_react", json!({ "messageId": message_id, "emoji": "👍" }))).await.expect("send");
    let _ack = recv_until(&mut guest, |env| env.kind == OutboundKind::Ack).await;
    let reaction = recv_until(&mut host, |env| env.data["event"] == "reaction_add").await;
    assert_eq!(reaction.data["messageId"], message_id);
    assert_eq!(reaction.data["emoji"], "👍");
}

#[tokio::test]
async fn test_game_op_without_a_session_is_not_a_player() {
    let addr = start_hub().await;
    let mut ws = connect(&addr, "grace", "Grace").await;
    let _welcome = recv(&mut ws).await;

    ws.send(action("game_move", json!({ "move": { "row": 0, "col": 0 } }))).await.expect("send");
    let err = recv(&mut ws).await;
    assert_eq!(err.kind, OutboundKind::Error);
    assert_eq!(err.data["kind"], "NOT_A_PLAYER");
}

#[tokio::test]
async fn test_multiple_connections_get_independent_identities() {
    let addr = start_hub().await;
    let mut ws1 = connect(&addr, "idp-1", "One").await;
    let mut ws2 = connect(&addr, "idp-2", "Two").await;

    let w1 = recv(&mut ws1).await;
    let w2 = recv(&mut ws2).await;
    assert_ne!(w1.data["agentId"], w2.data["agentId"]);
    assert_eq!(w1.data["displayName"], "One");
    assert_eq!(w2.data["displayName"], "Two");
}
