//! The connection hub: accept loop, handshake, heartbeat, and per-connection
//! message loop, wiring every sub-crate behind [`crate::router::classify`].
//!
//! Generalizes `arcforge/src/server.rs`'s `ArcforgeServerBuilder`/
//! `ArcforgeServer` and `arcforge/src/handler.rs`'s `handle_connection`/
//! `perform_handshake` flow: `arcforge` was generic over one `GameLogic`
//! and routed two message shapes (`System`/`Game`); this hub holds a
//! [`liku_session::SessionManager`] that is itself generic over game type
//! via [`liku_game::GameRegistry`], and routes the wire's closed action
//! vocabulary through [`crate::router`] instead.
//!
//! Lock order: connection → agent → matchmaker → session → chat-room.
//! Chat operations never call back into a session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use liku_auth::{AllowAllAuthenticator, Authenticator, JwtAuthenticator};
use liku_chat::{ChatManager, ParticipantRole, RoomSettings, RoomType};
use liku_game::{tic_tac_toe, Erased, GameRegistry};
use liku_matchmaker::Matchmaker;
use liku_protocol::{
    decode_inbound, encode_outbound, AgentRole, AgentType, ErrorKind, InboundEnvelope, InboundKind, OutboundEnvelope, OutboundKind,
};
use liku_registry::{AgentId, AgentRegistry};
use liku_ratelimit::{Limiter, RateLimitError};
use liku_session::{SeatRequest, SessionManager};
use liku_spectator::{spawn_broadcaster, BroadcastFrame, SpectatorConfig, SpectatorHandle};
use liku_transport::{Connection, ConnectionId, Transport, WebSocketTransport};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::health::HealthServer;
use crate::metrics::Metrics;
use crate::router::{self, Command};
use crate::subscriptions::SubscriptionSet;

/// Periodic maintenance cadence: sweeps expired match tickets and reaps
/// finished sessions past their TTL.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

fn room_id_for(session_id: liku_session::SessionId) -> liku_chat::RoomId {
    liku_chat::RoomId::from_uuid(session_id.as_uuid())
}

/// Per-connection outbound queue. Every task that produces a frame for this
/// connection — the reader's own replies, a session's event forwarder, a
/// spectator's broadcast forwarder — pushes onto this channel rather than
/// touching the transport directly, so only one task ever calls
/// [`Connection::send`].
type OutboundSender = mpsc::UnboundedSender<OutboundEnvelope>;

/// Shared state behind every connection handler task.
struct HubState<A: Authenticator> {
    config: HubConfig,
    auth: A,
    registry: Mutex<AgentRegistry>,
    sessions: Mutex<SessionManager>,
    matchmaker: Mutex<Matchmaker>,
    chat: Mutex<ChatManager>,
    spectators: Mutex<std::collections::HashMap<liku_session::SessionId, SpectatorHandle>>,
    /// A hosted ticket's code to everything its connection needs to pick
    /// its session-event forwarder back up once a guest joins. The
    /// forwarder itself isn't spawned until then — only `handle_join_match`
    /// learns the session id the matchmaker actually created.
    pending_hosts: Mutex<std::collections::HashMap<String, PendingHost>>,
    /// Resolves a match code to the session it produced, so
    /// `spectate_match` can find a session without exposing raw session
    /// ids on the wire.
    ticket_sessions: Mutex<std::collections::HashMap<String, liku_session::SessionId>>,
    /// Per-room chat fanout, keyed the same way as [`ChatManager`]'s own
    /// rooms. Chat has no actor of its own (see `liku-chat`'s manager doc
    /// comment), so the hub fans its events out itself after each mutating
    /// call instead of a forwarder task doing it.
    chat_fanout: Mutex<std::collections::HashMap<liku_chat::RoomId, std::collections::HashMap<AgentId, OutboundSender>>>,
    metrics: Arc<Metrics>,
}

/// What a hosted ticket needs kept alive between `host_game` and the
/// `join_match` call (from a different connection) that completes it.
struct PendingHost {
    sender: liku_session::ParticipantSender,
    receiver: mpsc::UnboundedReceiver<liku_session::SessionEvent>,
    outbound_tx: OutboundSender,
    subs: Arc<Mutex<SubscriptionSet>>,
}

/// Builder for a [`Hub`], mirroring `ArcforgeServerBuilder`'s shape.
pub struct HubBuilder {
    config: HubConfig,
}

impl HubBuilder {
    pub fn new(config: HubConfig) -> Self {
        Self { config }
    }

    /// Binds the WebSocket transport and the health sibling, registers the
    /// reference `tic_tac_toe` game type, and returns a running-ready
    /// [`Hub`]. Chess has no registered [`liku_game::GameProtocol`] yet —
    /// `chess_*` actions reach the session layer and fail `NOT_FOUND`,
    /// per the router's documented classification decision.
    pub async fn build<A: Authenticator>(self, auth: A) -> Result<Hub<A>, HubError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await.map_err(HubError::Transport)?;

        let mut registry = GameRegistry::new();
        registry.register("tic_tac_toe", || Box::new(Erased::<tic_tac_toe::TicTacToe>::new(tic_tac_toe::Config)));

        let metrics = Arc::new(Metrics::new(self.config.max_clients));
        let health = HealthServer::bind(&self.config.resolved_health_bind_addr(), metrics.clone()).await.map_err(|err| {
            HubError::Internal(format!("failed to bind health server: {err}"))
        })?;

        let state = Arc::new(HubState {
            config: self.config,
            auth,
            registry: Mutex::new(AgentRegistry::new()),
            sessions: Mutex::new(SessionManager::new(registry)),
            matchmaker: Mutex::new(Matchmaker::new()),
            chat: Mutex::new(ChatManager::new()),
            spectators: Mutex::new(std::collections::HashMap::new()),
            pending_hosts: Mutex::new(std::collections::HashMap::new()),
            ticket_sessions: Mutex::new(std::collections::HashMap::new()),
            chat_fanout: Mutex::new(std::collections::HashMap::new()),
            metrics,
        });

        Ok(Hub { transport, state, health })
    }
}

/// Builds a [`Hub`] with [`liku_auth::AllowAllAuthenticator`], for local
/// development and integration tests.
pub async fn dev_hub(config: HubConfig) -> Result<Hub<AllowAllAuthenticator>, HubError> {
    HubBuilder::new(config).build(AllowAllAuthenticator).await
}

/// Builds a [`Hub`] backed by [`liku_auth::JwtAuthenticator`] using
/// [`crate::config::AuthConfig`].
pub async fn jwt_hub(config: HubConfig) -> Result<Hub<JwtAuthenticator>, HubError> {
    let auth = {
        let a = &config.auth;
        JwtAuthenticator::new(&a.secret, a.algorithm, a.issuer.as_deref(), a.audience.as_deref())
    };
    HubBuilder::new(config).build(auth).await
}

/// A running Liku connection hub. Call [`Hub::run`] to start accepting
/// connections; it never returns under normal operation.
pub struct Hub<A: Authenticator> {
    transport: WebSocketTransport,
    state: Arc<HubState<A>>,
    health: HealthServer,
}

impl<A: Authenticator> Hub<A> {
    pub fn builder(config: HubConfig) -> HubBuilder {
        HubBuilder::new(config)
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    pub fn health_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.health.local_addr()
    }

    pub async fn run(mut self) -> Result<(), HubError> {
        tracing::info!("Liku hub running");

        tokio::spawn(self.health.run());
        tokio::spawn(maintenance_loop(self.state.clone()));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(err) = run_connection_contained(conn, state).await {
                            tracing::debug!(error = %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => {
                    tracing::error!(error = %err, "accept failed");
                }
            }
        }
    }
}

async fn maintenance_loop<A: Authenticator>(state: Arc<HubState<A>>) {
    let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
    loop {
        ticker.tick().await;
        let now = SystemTime::now();
        let expired_codes = state.matchmaker.lock().await.sweep_expired(now);
        if !expired_codes.is_empty() {
            tracing::debug!(count = expired_codes.len(), "swept expired match tickets");
        }
        let reaped = state.sessions.lock().await.reap_finished().await;
        for session_id in reaped {
            state.spectators.lock().await.remove(&session_id);
            state.chat.lock().await.delete_room(room_id_for(session_id));
        }
    }
}

/// Wraps [`run_connection`] so a panic inside the handler becomes an
/// [`HubError::Internal`] instead of taking down the accept loop. Generalizes
/// `arcforge`'s `SessionGuard` `Drop`-triggered cleanup, which only protected
/// against early return, not an actual panic.
async fn run_connection_contained<A: Authenticator>(conn: <WebSocketTransport as Transport>::Connection, state: Arc<HubState<A>>) -> Result<(), HubError> {
    let conn_id = conn.id();
    state.metrics.record_connect();
    let outcome = tokio::spawn(run_connection(conn, state.clone())).await;
    state.metrics.record_disconnect();
    match outcome {
        Ok(result) => result,
        Err(join_err) => {
            state.metrics.record_error();
            tracing::error!(%conn_id, error = %join_err, "connection task panicked");
            Err(HubError::Internal(format!("connection task panicked: {join_err}")))
        }
    }
}

/// Per-connection mutable state the message loop and dispatch functions
/// share. `subs` is behind a mutex because the session/spectator/chat
/// forwarder tasks read it concurrently with the main loop's
/// subscribe/unsubscribe handling.
struct ConnCtx {
    conn_id: ConnectionId,
    agent_id: AgentId,
    display_name: String,
    outbound_tx: OutboundSender,
    subs: Arc<Mutex<SubscriptionSet>>,
    spectating: HashSet<liku_session::SessionId>,
    chat_rooms: HashSet<liku_chat::RoomId>,
    hosted_code: Option<String>,
}

async fn run_connection<A: Authenticator>(
    conn: <WebSocketTransport as Transport>::Connection,
    state: Arc<HubState<A>>,
) -> Result<(), HubError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let creds = conn.handshake_credentials().clone();
    let claims = match state.auth.authenticate(creds.token.as_deref()).await {
        Ok(claims) => claims,
        Err(err) => {
            let envelope = OutboundEnvelope::error(ErrorKind::AuthFailed, err.to_string(), now_ms());
            let _ = conn.send(&encode_outbound(&envelope).map_err(HubError::Protocol)?).await;
            let _ = conn.close().await;
            return Err(HubError::Auth(err));
        }
    };

    let display_name = creds.display_name.clone().or_else(|| claims.name.clone()).unwrap_or_else(|| claims.sub.clone());
    let agent_type = match creds.agent_type.as_deref() {
        Some("ai") => AgentType::Ai,
        Some("spectator") => AgentType::Spectator,
        _ => AgentType::Human,
    };
    let role = match claims.role.as_deref() {
        Some("spectator") => AgentRole::Spectator,
        Some("admin") => AgentRole::Admin,
        _ => AgentRole::Player,
    };

    let agent_id = {
        let mut registry = state.registry.lock().await;
        registry.register(Some(&claims.sub), display_name.clone(), agent_type, role, conn_id, std::time::Instant::now())
    };

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundEnvelope>();

    let writer_conn = conn.clone();
    let writer_metrics = state.metrics.clone();
    let writer = tokio::spawn(async move {
        while let Some(envelope) = outbound_rx.recv().await {
            match encode_outbound(&envelope) {
                Ok(bytes) => {
                    writer_metrics.record_sent(bytes.len());
                    if writer_conn.send(&bytes).await.is_err() {
                        break;
                    }
                }
                Err(err) => tracing::warn!(error = %err, "failed to encode outbound envelope"),
            }
        }
    });

    let welcome = OutboundEnvelope::new(
        OutboundKind::Welcome,
        json!({ "agentId": agent_id.to_string(), "displayName": display_name, "heartbeatIntervalMs": state.config.heartbeat_interval.as_millis() as u64 }),
        now_ms(),
    );
    let _ = outbound_tx.send(welcome);

    let mut ctx = ConnCtx {
        conn_id,
        agent_id,
        display_name,
        outbound_tx: outbound_tx.clone(),
        subs: Arc::new(Mutex::new(SubscriptionSet::new())),
        spectating: HashSet::new(),
        chat_rooms: HashSet::new(),
        hosted_code: None,
    };

    let mut limiter = Limiter::new(state.config.rate_limit);
    let mut heartbeat = tokio::time::interval(state.config.heartbeat_interval);
    let recv_timeout = state.config.heartbeat_interval * 3;

    let result = loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                let ping = OutboundEnvelope::new(OutboundKind::Pong, json!({}), now_ms());
                if outbound_tx.send(ping).is_err() {
                    break Ok(());
                }
            }
            recv = tokio::time::timeout(recv_timeout, conn.recv()) => {
                match recv {
                    Ok(Ok(Some(data))) => {
                        state.metrics.record_received(data.len());
                        if let Err(stop) = handle_frame(&data, &mut ctx, &mut limiter, &state, &conn).await {
                            break stop;
                        }
                    }
                    Ok(Ok(None)) => {
                        tracing::info!(agent_id = %agent_id, "connection closed cleanly");
                        break Ok(());
                    }
                    Ok(Err(err)) => {
                        tracing::debug!(agent_id = %agent_id, error = %err, "recv error");
                        break Ok(());
                    }
                    Err(_) => {
                        tracing::info!(agent_id = %agent_id, "connection timed out waiting for a frame");
                        break Ok(());
                    }
                }
            }
        }
    };

    teardown(&ctx, &state).await;
    drop(outbound_tx);
    let _ = writer.await;
    let _ = conn.close().await;
    result
}

/// Returns `Err` only to signal the message loop should stop; a `None`
/// inner result there is not itself a hub-level failure.
async fn handle_frame<A: Authenticator>(
    data: &[u8],
    ctx: &mut ConnCtx,
    limiter: &mut Limiter,
    state: &Arc<HubState<A>>,
    conn: &Arc<<WebSocketTransport as Transport>::Connection>,
) -> Result<(), Result<(), HubError>> {
    let _ = conn;
    let envelope = match decode_inbound(data) {
        Ok(env) => env,
        Err(err) => {
            send_error(&ctx.outbound_tx, HubError::Protocol(err).kind(), "malformed frame", None);
            return Ok(());
        }
    };

    let now = std::time::Instant::now();
    if envelope.kind != InboundKind::Ping {
        if let Err(rate_err) = limiter.check(now) {
            state.metrics.record_error();
            send_error(&ctx.outbound_tx, rate_limit_kind(&rate_err), rate_err.to_string(), envelope.request_id.clone());
            return Ok(());
        }
    } else if let Err(rate_err) = limiter.check_exempt(now) {
        send_error(&ctx.outbound_tx, rate_limit_kind(&rate_err), rate_err.to_string(), envelope.request_id.clone());
        return Ok(());
    }

    match dispatch(envelope, ctx, state).await {
        Ok(Some(response)) => {
            let _ = ctx.outbound_tx.send(response);
        }
        Ok(None) => {}
        Err(err) => {
            state.metrics.record_error();
            send_error(&ctx.outbound_tx, err.kind(), err.to_string(), None);
        }
    }
    Ok(())
}

fn rate_limit_kind(err: &RateLimitError) -> ErrorKind {
    match err {
        RateLimitError::WindowExceeded | RateLimitError::BurstCooldown | RateLimitError::Banned(_) => ErrorKind::RateLimited,
    }
}

fn send_error(tx: &OutboundSender, kind: ErrorKind, message: impl Into<String>, request_id: Option<String>) {
    let envelope = OutboundEnvelope::error(kind, message, now_ms()).with_request_id(request_id);
    let _ = tx.send(envelope);
}

async fn dispatch<A: Authenticator>(envelope: InboundEnvelope, ctx: &mut ConnCtx, state: &Arc<HubState<A>>) -> Result<Option<OutboundEnvelope>, HubError> {
    let request_id = envelope.request_id.clone();
    match envelope.kind {
        InboundKind::Ping => Ok(Some(OutboundEnvelope::new(OutboundKind::Pong, json!({}), now_ms()).with_request_id(request_id))),
        InboundKind::Subscribe => {
            let topic = envelope.payload.get("topic").and_then(Value::as_str).ok_or(HubError::MissingField("topic"))?;
            ctx.subs.lock().await.subscribe(topic);
            Ok(Some(ack(request_id)))
        }
        InboundKind::Unsubscribe => {
            let topic = envelope.payload.get("topic").and_then(Value::as_str).ok_or(HubError::MissingField("topic"))?;
            ctx.subs.lock().await.unsubscribe(topic);
            Ok(Some(ack(request_id)))
        }
        InboundKind::Query => handle_query(&envelope.payload, ctx, state).await.map(|v| Some(v.with_request_id(request_id))),
        InboundKind::Key => {
            let name = envelope.payload.get("name").and_then(Value::as_str).ok_or(HubError::MissingField("name"))?;
            router::classify(name)?;
            Ok(Some(ack(request_id)))
        }
        InboundKind::Action => {
            let name = envelope.payload.get("name").and_then(Value::as_str).ok_or(HubError::MissingField("name"))?;
            let command = router::classify(name)?;
            handle_command(command, &envelope.payload, ctx, state).await.map(|v| v.map(|e| e.with_request_id(request_id)))
        }
    }
}

fn ack(request_id: Option<String>) -> OutboundEnvelope {
    OutboundEnvelope::new(OutboundKind::Ack, json!({}), now_ms()).with_request_id(request_id)
}

async fn handle_query<A: Authenticator>(payload: &Value, ctx: &ConnCtx, state: &Arc<HubState<A>>) -> Result<OutboundEnvelope, HubError> {
    let name = payload.get("name").and_then(Value::as_str).ok_or(HubError::MissingField("name"))?;
    match name {
        "list_matches" => {
            let tickets = state.matchmaker.lock().await.list(ctx.agent_id, SystemTime::now());
            let data = json!({
                "matches": tickets.into_iter().map(|t| json!({
                    "code": t.code,
                    "gameType": t.game_type,
                    "hostDisplayName": t.host_display_name,
                })).collect::<Vec<_>>(),
            });
            Ok(OutboundEnvelope::new(OutboundKind::Result, data, now_ms()))
        }
        "session_info" => {
            let session_id = state.sessions.lock().await.player_session(ctx.agent_id);
            match session_id {
                Some(id) => {
                    let handle = state.sessions.lock().await.handle(id)?.clone();
                    let info = handle.get_info().await?;
                    Ok(OutboundEnvelope::new(
                        OutboundKind::Result,
                        json!({
                            "status": info.status.to_string(),
                            "playerCount": info.player_count,
                            "spectatorCount": info.spectator_count,
                            "currentToMove": info.current_to_move,
                        }),
                        now_ms(),
                    ))
                }
                None => Ok(OutboundEnvelope::new(OutboundKind::Result, json!({ "status": "none" }), now_ms())),
            }
        }
        other => Err(HubError::UnknownCommand(other.to_string())),
    }
}

async fn handle_command<A: Authenticator>(
    command: Command,
    payload: &Value,
    ctx: &mut ConnCtx,
    state: &Arc<HubState<A>>,
) -> Result<Option<OutboundEnvelope>, HubError> {
    match command {
        Command::UniversalInput { name } => Ok(Some(OutboundEnvelope::new(OutboundKind::Ack, json!({ "input": name }), now_ms()))),
        Command::HostGame => handle_host_game(payload, ctx, state).await,
        Command::JoinMatch => handle_join_match(payload, ctx, state).await,
        Command::CancelMatch => handle_cancel_match(payload, ctx, state).await,
        Command::ListMatches => handle_query(&json!({ "name": "list_matches" }), ctx, state).await.map(Some),
        Command::SpectateMatch => handle_spectate_match(payload, ctx, state).await,
        Command::Game { op } => handle_game_op(&op, payload, ctx, state).await,
        Command::Chat { op } => handle_chat_op(&op, payload, ctx, state).await,
    }
}

/// Spawns the task that drains one participant's `SessionEvent` stream onto
/// its connection's outbound queue. `rx` must be the paired receiver of a
/// [`liku_session::ParticipantSender`] already handed to the session (via
/// [`liku_session::SessionHandle::join`] or [`Matchmaker::join`]) — the
/// sender side is what the session actor fans events into.
fn spawn_session_event_forwarder(
    session_id: liku_session::SessionId,
    mut rx: mpsc::UnboundedReceiver<liku_session::SessionEvent>,
    outbound_tx: OutboundSender,
    subs: Arc<Mutex<SubscriptionSet>>,
) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let (topic, envelope) = session_event_envelope(session_id, &event);
            if subs.lock().await.is_subscribed(topic) {
                if outbound_tx.send(envelope).is_err() {
                    break;
                }
            }
        }
    });
}

fn session_event_envelope(session_id: liku_session::SessionId, event: &liku_session::SessionEvent) -> (&'static str, OutboundEnvelope) {
    use liku_session::SessionEvent::*;
    let sid = session_id.to_string();
    match event {
        PlayerJoined { slot, agent_id } => (
            "event",
            OutboundEnvelope::new(OutboundKind::Event, json!({ "event": "player_joined", "sessionId": sid, "slot": slot, "agentId": agent_id.to_string() }), now_ms()),
        ),
        SpectatorJoined { agent_id, spectator_count } => (
            "event",
            OutboundEnvelope::new(OutboundKind::Event, json!({ "event": "spectator_joined", "sessionId": sid, "agentId": agent_id.to_string(), "spectatorCount": spectator_count }), now_ms()),
        ),
        GameStarted { state: game_state, current_to_move } => (
            "state",
            OutboundEnvelope::new(OutboundKind::State, json!({ "sessionId": sid, "state": game_state, "currentToMove": current_to_move }), now_ms()),
        ),
        MoveMade { state: game_state, slot, move_number, current_to_move } => (
            "state",
            OutboundEnvelope::new(
                OutboundKind::State,
                json!({ "sessionId": sid, "state": game_state, "slot": slot, "moveNumber": move_number, "currentToMove": current_to_move }),
                now_ms(),
            ),
        ),
        GameEnded { outcome, reason } => (
            "event",
            OutboundEnvelope::new(
                OutboundKind::Event,
                json!({ "event": "game_ended", "sessionId": sid, "outcome": outcome, "reason": reason }),
                now_ms(),
            ),
        ),
        PlayerLeft { slot, agent_id } => (
            "event",
            OutboundEnvelope::new(OutboundKind::Event, json!({ "event": "player_left", "sessionId": sid, "slot": slot, "agentId": agent_id.to_string() }), now_ms()),
        ),
        SpectatorLeft { agent_id, spectator_count } => (
            "event",
            OutboundEnvelope::new(OutboundKind::Event, json!({ "event": "spectator_left", "sessionId": sid, "agentId": agent_id.to_string(), "spectatorCount": spectator_count }), now_ms()),
        ),
        TurnTimeout { slot } => (
            "event",
            OutboundEnvelope::new(OutboundKind::Event, json!({ "event": "turn_timeout", "sessionId": sid, "slot": slot }), now_ms()),
        ),
        Rematch { state: game_state } => (
            "state",
            OutboundEnvelope::new(OutboundKind::State, json!({ "sessionId": sid, "state": game_state }), now_ms()),
        ),
    }
}

async fn handle_host_game<A: Authenticator>(payload: &Value, ctx: &mut ConnCtx, state: &Arc<HubState<A>>) -> Result<Option<OutboundEnvelope>, HubError> {
    let game_type = payload.get("gameType").and_then(Value::as_str).unwrap_or("tic_tac_toe").to_string();
    let mut matchmaker = state.matchmaker.lock().await;
    let ticket = matchmaker.host(ctx.agent_id, ctx.display_name.clone(), game_type, SystemTime::now());
    drop(matchmaker);

    let (sender, receiver) = mpsc::unbounded_channel();
    let pending = PendingHost { sender, receiver, outbound_tx: ctx.outbound_tx.clone(), subs: ctx.subs.clone() };
    state.pending_hosts.lock().await.insert(ticket.code.clone(), pending);
    ctx.hosted_code = Some(ticket.code.clone());

    Ok(Some(OutboundEnvelope::new(
        OutboundKind::Result,
        json!({ "event": "hosted", "code": ticket.code, "gameType": ticket.game_type, "expiresInSeconds": ticket.expires_at.duration_since(ticket.created_at).unwrap_or_default().as_secs() }),
        now_ms(),
    )))
}

async fn handle_join_match<A: Authenticator>(payload: &Value, ctx: &mut ConnCtx, state: &Arc<HubState<A>>) -> Result<Option<OutboundEnvelope>, HubError> {
    let code = payload.get("code").and_then(Value::as_str).ok_or(HubError::MissingField("code"))?;

    let pending_host = {
        let mut pending = state.pending_hosts.lock().await;
        pending.remove(liku_matchmaker::normalize_code(code).as_str())
    };
    let pending_host = pending_host.ok_or(liku_matchmaker::MatchError::NotFound)?;

    let (guest_sender, guest_receiver) = mpsc::unbounded_channel();

    let mut matchmaker = state.matchmaker.lock().await;
    let mut sessions = state.sessions.lock().await;
    let found = matchmaker.join(code, ctx.agent_id, pending_host.sender, guest_sender, &mut sessions, SystemTime::now()).await?;
    drop(sessions);
    drop(matchmaker);

    // Only now is the real session id known, so the host's forwarder is
    // spawned here instead of at `host_game` time.
    spawn_session_event_forwarder(found.session_id, pending_host.receiver, pending_host.outbound_tx, pending_host.subs);
    spawn_session_event_forwarder(found.session_id, guest_receiver, ctx.outbound_tx.clone(), ctx.subs.clone());

    state.ticket_sessions.lock().await.insert(liku_matchmaker::normalize_code(code), found.session_id);
    state.chat.lock().await.create_room(room_id_for(found.session_id), format!("match-{code}"), RoomType::Game, RoomSettings::default());

    Ok(Some(OutboundEnvelope::new(
        OutboundKind::Result,
        json!({
            "event": "matched",
            "code": found.code,
            "hostSlot": found.host_slot,
            "guestSlot": found.guest_slot,
            "startingSlot": found.starting_slot,
        }),
        now_ms(),
    )))
}

async fn handle_cancel_match<A: Authenticator>(payload: &Value, ctx: &mut ConnCtx, state: &Arc<HubState<A>>) -> Result<Option<OutboundEnvelope>, HubError> {
    let code = payload.get("code").and_then(Value::as_str).ok_or(HubError::MissingField("code"))?;
    state.matchmaker.lock().await.cancel(code, ctx.agent_id)?;
    state.pending_hosts.lock().await.remove(liku_matchmaker::normalize_code(code).as_str());
    if ctx.hosted_code.as_deref() == Some(code) {
        ctx.hosted_code = None;
    }
    Ok(Some(OutboundEnvelope::new(OutboundKind::Result, json!({ "event": "cancelled", "code": code }), now_ms())))
}

async fn handle_spectate_match<A: Authenticator>(payload: &Value, ctx: &mut ConnCtx, state: &Arc<HubState<A>>) -> Result<Option<OutboundEnvelope>, HubError> {
    let code = payload.get("code").and_then(Value::as_str).ok_or(HubError::MissingField("code"))?;
    let session_id = {
        let sessions = state.ticket_sessions.lock().await;
        *sessions.get(&liku_matchmaker::normalize_code(code)).ok_or(liku_matchmaker::MatchError::NotFound)?
    };

    let handle = state.sessions.lock().await.handle(session_id)?.clone();
    let (sender, receiver) = mpsc::unbounded_channel();
    handle.join(ctx.agent_id, SeatRequest::Spectator, sender).await?;
    spawn_session_event_forwarder(session_id, receiver, ctx.outbound_tx.clone(), ctx.subs.clone());

    let spectator_handle = {
        let mut spectators = state.spectators.lock().await;
        if let Some(existing) = spectators.get(&session_id) {
            existing.clone()
        } else {
            let info = handle.get_info().await?;
            let profile = state.config.game_profile(&info.game_type).clone();
            let spectator_config = SpectatorConfig { broadcast_interval: profile.broadcast_interval, max_spectators: profile.spectator_cap, ..SpectatorConfig::default() };
            let (session_tx, session_rx) = mpsc::unbounded_channel();
            handle.observe(session_tx).await?;
            let new_handle = spawn_broadcaster(session_id, spectator_config, info.state.clone(), session_rx);
            spectators.insert(session_id, new_handle.clone());
            new_handle
        }
    };

    let (spectator_tx, mut spectator_rx) = mpsc::unbounded_channel::<BroadcastFrame>();
    spectator_handle.attach(ctx.agent_id, spectator_tx).await?;
    let outbound_tx = ctx.outbound_tx.clone();
    tokio::spawn(async move {
        while let Some(frame) = spectator_rx.recv().await {
            let envelope = match frame {
                BroadcastFrame::Snapshot(state) => OutboundEnvelope::new(OutboundKind::State, json!({ "sessionId": session_id.to_string(), "snapshot": state }), now_ms()),
                BroadcastFrame::Patch(ops) => OutboundEnvelope::new(OutboundKind::State, json!({ "sessionId": session_id.to_string(), "patch": ops }), now_ms()),
                BroadcastFrame::Ping { nonce } => OutboundEnvelope::new(OutboundKind::Pong, json!({ "nonce": nonce }), now_ms()),
            };
            if outbound_tx.send(envelope).is_err() {
                break;
            }
        }
    });

    ctx.spectating.insert(session_id);
    Ok(Some(OutboundEnvelope::new(OutboundKind::Result, json!({ "event": "spectating", "code": code }), now_ms())))
}

async fn handle_game_op<A: Authenticator>(op: &str, payload: &Value, ctx: &mut ConnCtx, state: &Arc<HubState<A>>) -> Result<Option<OutboundEnvelope>, HubError> {
    let session_id = state
        .sessions
        .lock()
        .await
        .player_session(ctx.agent_id)
        .ok_or_else(|| HubError::Session(liku_session::SessionError::NotAPlayer(ctx.agent_id)))?;
    let handle = state.sessions.lock().await.handle(session_id)?.clone();

    match op {
        "ready" => {
            let started = handle.ready(ctx.agent_id).await?;
            Ok(Some(OutboundEnvelope::new(OutboundKind::Ack, json!({ "ready": true, "started": started }), now_ms())))
        }
        "move" => {
            let action = payload.get("move").cloned().ok_or(HubError::MissingField("move"))?;
            let outcome = handle.submit_move(ctx.agent_id, action).await?;
            Ok(Some(OutboundEnvelope::new(
                OutboundKind::State,
                json!({ "sessionId": session_id.to_string(), "state": outcome.state, "moveNumber": outcome.move_number, "outcome": outcome.outcome, "currentToMove": outcome.current_to_move }),
                now_ms(),
            )))
        }
        "leave" => {
            let outcome = handle.leave(ctx.agent_id).await?;
            state.sessions.lock().await.unbind_player(ctx.agent_id);
            Ok(Some(OutboundEnvelope::new(
                OutboundKind::Ack,
                json!({ "left": true, "sessionOutcome": outcome.session_outcome }),
                now_ms(),
            )))
        }
        "rematch" => {
            handle.rematch().await?;
            Ok(Some(ack(None)))
        }
        "join" => {
            let (sender, receiver) = mpsc::unbounded_channel();
            let outcome = handle.join(ctx.agent_id, SeatRequest::Player { preferred_slot: None }, sender).await?;
            spawn_session_event_forwarder(session_id, receiver, ctx.outbound_tx.clone(), ctx.subs.clone());
            if let liku_session::JoinOutcome::Player { .. } = outcome {
                state.sessions.lock().await.bind_player(ctx.agent_id, session_id)?;
            }
            Ok(Some(ack(None)))
        }
        other => Err(HubError::UnknownCommand(other.to_string())),
    }
}

/// Resolves which room a chat op targets. A connection's current game
/// session (if it's playing one) wins, then whichever session it's
/// spectating, then — for a connection already joined to a room but no
/// longer playing or spectating (e.g. a pure lobby chat) — the most
/// recently joined room it's still tracking directly.
async fn resolve_chat_room<A: Authenticator>(ctx: &ConnCtx, state: &Arc<HubState<A>>) -> Result<liku_chat::RoomId, HubError> {
    if let Some(session_id) = state.sessions.lock().await.player_session(ctx.agent_id) {
        return Ok(room_id_for(session_id));
    }
    if let Some(&session_id) = ctx.spectating.iter().next() {
        return Ok(room_id_for(session_id));
    }
    ctx.chat_rooms.iter().next().copied().ok_or_else(|| HubError::Chat(liku_chat::ChatError::NotInRoom(ctx.agent_id)))
}

async fn handle_chat_op<A: Authenticator>(op: &str, payload: &Value, ctx: &mut ConnCtx, state: &Arc<HubState<A>>) -> Result<Option<OutboundEnvelope>, HubError> {
    match op {
        "join" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let event = state.chat.lock().await.join(room_id, ctx.agent_id, ctx.display_name.clone(), ParticipantRole::Player, SystemTime::now())?;
            ctx.chat_rooms.insert(room_id);
            register_chat_fanout(state, room_id, ctx.agent_id, ctx.outbound_tx.clone()).await;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "leave" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let event = state.chat.lock().await.leave(room_id, ctx.agent_id)?;
            ctx.chat_rooms.remove(&room_id);
            unregister_chat_fanout(state, room_id, ctx.agent_id).await;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "send" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let content = payload.get("content").and_then(Value::as_str).ok_or(HubError::MissingField("content"))?;
            let reply_to = payload.get("replyTo").and_then(Value::as_str).map(parse_message_id).transpose()?;
            let event = state.chat.lock().await.send_text(room_id, ctx.agent_id, ctx.display_name.clone(), content, reply_to, (SystemTime::now(), std::time::Instant::now()))?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "whisper" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let target = parse_agent_id(payload, "target")?;
            let content = payload.get("content").and_then(Value::as_str).ok_or(HubError::MissingField("content"))?;
            let message = state.chat.lock().await.send_whisper(room_id, ctx.agent_id, ctx.display_name.clone(), target, content, (SystemTime::now(), std::time::Instant::now()))?;
            deliver_to(state, room_id, target, chat_message_envelope(&message)).await;
            Ok(Some(ack(None)))
        }
        "react" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let message_id = parse_message_id(payload.get("messageId").and_then(Value::as_str).ok_or(HubError::MissingField("messageId"))?)?;
            let emoji = payload.get("emoji").and_then(Value::as_str).ok_or(HubError::MissingField("emoji"))?.to_string();
            let event = state.chat.lock().await.add_reaction(room_id, message_id, ctx.agent_id, emoji)?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "unreact" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let message_id = parse_message_id(payload.get("messageId").and_then(Value::as_str).ok_or(HubError::MissingField("messageId"))?)?;
            let emoji = payload.get("emoji").and_then(Value::as_str).ok_or(HubError::MissingField("emoji"))?.to_string();
            let event = state.chat.lock().await.remove_reaction(room_id, message_id, ctx.agent_id, emoji)?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "mute" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let target = parse_agent_id(payload, "target")?;
            let seconds = payload.get("durationSeconds").and_then(Value::as_u64).unwrap_or(60);
            let now = SystemTime::now();
            let until = now + Duration::from_secs(seconds);
            let event = state.chat.lock().await.mute(room_id, ctx.agent_id, target, until, now)?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "unmute" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let target = parse_agent_id(payload, "target")?;
            let event = state.chat.lock().await.unmute(room_id, ctx.agent_id, target)?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "kick" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let target = parse_agent_id(payload, "target")?;
            let event = state.chat.lock().await.kick(room_id, ctx.agent_id, target)?;
            unregister_chat_fanout(state, room_id, target).await;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "delete" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let message_id = parse_message_id(payload.get("messageId").and_then(Value::as_str).ok_or(HubError::MissingField("messageId"))?)?;
            let event = state.chat.lock().await.delete_message(room_id, ctx.agent_id, message_id)?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "system" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let content = payload.get("content").and_then(Value::as_str).ok_or(HubError::MissingField("content"))?;
            let event = state.chat.lock().await.send_system(room_id, content, SystemTime::now())?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(Some(ack(None)))
        }
        "typing" => {
            let room_id = resolve_chat_room(ctx, state).await?;
            let event = state.chat.lock().await.typing(room_id, ctx.agent_id)?;
            fanout_chat_event(state, room_id, &event).await;
            Ok(None)
        }
        other => Err(HubError::UnknownCommand(other.to_string())),
    }
}

/// Parses a target agent id from a client payload field. The value is
/// expected to be the uuid a prior event handed this client (e.g.
/// `player_joined`'s `agentId`), round-tripped back by
/// [`AgentId::from_uuid`] — callers that need to confirm the agent is
/// still registered do so via [`AgentRegistry::get`] themselves.
fn parse_agent_id(payload: &Value, field: &'static str) -> Result<AgentId, HubError> {
    let raw = payload.get(field).and_then(Value::as_str).ok_or(HubError::MissingField(field))?;
    let uuid = uuid::Uuid::parse_str(raw).map_err(|_| HubError::InvalidJson(format!("{field} is not a valid agent id")))?;
    Ok(AgentId::from_uuid(uuid))
}

/// Parses a target message id from a client payload field, round-tripped
/// back by [`liku_chat::MessageId::from_uuid`] from a prior message
/// event's `id`.
fn parse_message_id(raw: &str) -> Result<liku_chat::MessageId, HubError> {
    let uuid = uuid::Uuid::parse_str(raw).map_err(|_| HubError::InvalidJson("messageId is not a valid message id".to_string()))?;
    Ok(liku_chat::MessageId::from_uuid(uuid))
}

async fn register_chat_fanout<A: Authenticator>(state: &Arc<HubState<A>>, room_id: liku_chat::RoomId, agent_id: AgentId, tx: OutboundSender) {
    let mut fanout = state.chat_fanout.lock().await;
    fanout.entry(room_id).or_default().insert(agent_id, tx);
}

async fn unregister_chat_fanout<A: Authenticator>(state: &Arc<HubState<A>>, room_id: liku_chat::RoomId, agent_id: AgentId) {
    let mut fanout = state.chat_fanout.lock().await;
    if let Some(room) = fanout.get_mut(&room_id) {
        room.remove(&agent_id);
    }
}

async fn deliver_to<A: Authenticator>(state: &Arc<HubState<A>>, room_id: liku_chat::RoomId, target: AgentId, envelope: OutboundEnvelope) {
    let fanout = state.chat_fanout.lock().await;
    if let Some(room) = fanout.get(&room_id) {
        if let Some(tx) = room.get(&target) {
            let _ = tx.send(envelope);
        }
    }
}

async fn fanout_chat_event<A: Authenticator>(state: &Arc<HubState<A>>, room_id: liku_chat::RoomId, event: &liku_chat::ChatEvent) {
    let envelope = chat_event_envelope(event);
    let fanout = state.chat_fanout.lock().await;
    if let Some(room) = fanout.get(&room_id) {
        for tx in room.values() {
            let _ = tx.send(envelope.clone());
        }
    }
}
fn chat_event_envelope(event: &liku_chat::ChatEvent) -> OutboundEnvelope {
    use liku_chat::ChatEvent::*;
    let data = match event {
        Message(message) => return chat_message_envelope(message),
        ReactionAdd { room_id, message_id, reaction } => {
            json!({ "event": "reaction_add", "roomId": room_id.to_string(), "messageId": message_id.as_uuid().to_string(), "user": reaction.user.to_string(), "emoji": reaction.emoji })
        }
        ReactionRemove { room_id, message_id, user, emoji } => {
            json!({ "event": "reaction_remove", "roomId": room_id.to_string(), "messageId": message_id.as_uuid().to_string(), "user": user.to_string(), "emoji": emoji })
        }
        Join { room_id, agent_id, role } => json!({ "event": "chat_join", "roomId": room_id.to_string(), "agentId": agent_id.to_string(), "role": format!("{role:?}") }),
        Leave { room_id, agent_id } => json!({ "event": "chat_leave", "roomId": room_id.to_string(), "agentId": agent_id.to_string() }),
        Muted { room_id, agent_id, duration } => json!({ "event": "muted", "roomId": room_id.to_string(), "agentId": agent_id.to_string(), "durationSeconds": duration.as_secs() }),
        Unmuted { room_id, agent_id } => json!({ "event": "unmuted", "roomId": room_id.to_string(), "agentId": agent_id.to_string() }),
        Kicked { room_id, agent_id, by } => json!({ "event": "kicked", "roomId": room_id.to_string(), "agentId": agent_id.to_string(), "by": by.to_string() }),
        MessageDeleted { room_id, message_id, by } => json!({ "event": "message_deleted", "roomId": room_id.to_string(), "messageId": message_id.as_uuid().to_string(), "by": by.to_string() }),
        Typing { room_id, agent_id } => json!({ "event": "typing", "roomId": room_id.to_string(), "agentId": agent_id.to_string() }),
    };
    OutboundEnvelope::new(OutboundKind::Event, data, now_ms())
}

fn chat_message_envelope(message: &liku_chat::ChatMessage) -> OutboundEnvelope {
    OutboundEnvelope::new(
        OutboundKind::Event,
        json!({
            "event": "chat_message",
            "messageId": message.id.as_uuid().to_string(),
            "roomId": message.room_id.to_string(),
            "senderId": message.sender_id.to_string(),
            "senderDisplayName": message.sender_display_name,
            "content": message.content,
            "kind": format!("{:?}", message.kind),
            "replyTo": message.reply_to.map(|id| id.as_uuid().to_string()),
        }),
        now_ms(),
    )
}

/// Tears down everything a connection owned: its session membership (as
/// player or spectator), its chat room participation, and its agent
/// registration, in the lock order connection → agent → matchmaker →
/// session → chat-room.
async fn teardown<A: Authenticator>(ctx: &ConnCtx, state: &Arc<HubState<A>>) {
    if let Some(code) = &ctx.hosted_code {
        state.pending_hosts.lock().await.remove(liku_matchmaker::normalize_code(code).as_str());
        let _ = state.matchmaker.lock().await.cancel(code, ctx.agent_id);
    }

    let player_session = state.sessions.lock().await.player_session(ctx.agent_id);
    if let Some(session_id) = player_session {
        if let Ok(handle) = state.sessions.lock().await.handle(session_id).cloned() {
            let _ = handle.leave(ctx.agent_id).await;
        }
        state.sessions.lock().await.unbind_player(ctx.agent_id);
    }

    for &session_id in &ctx.spectating {
        if let Ok(handle) = state.sessions.lock().await.handle(session_id).cloned() {
            let _ = handle.leave(ctx.agent_id).await;
        }
        if let Some(spectator_handle) = state.spectators.lock().await.get(&session_id) {
            spectator_handle.detach(ctx.agent_id).await;
        }
    }

    for &room_id in &ctx.chat_rooms {
        let _ = state.chat.lock().await.leave(room_id, ctx.agent_id);
        unregister_chat_fanout(state, room_id, ctx.agent_id).await;
    }

    let unbind = state.registry.lock().await.unbind_connection(ctx.conn_id);
    if let Ok((agent_id, remaining)) = unbind {
        if remaining == 0 {
            let _ = state.registry.lock().await.remove(agent_id);
        }
    }
}
