//! Session actor: an isolated Tokio task that owns one game instance.
//!
//! Each session runs in its own task, reachable only through an mpsc
//! channel — the actor model, same as a room in `arcforge-room`'s generic
//! game-room framework, except the session no longer needs a generic type
//! parameter: it holds a [`liku_game::ErasedGameProtocol`] trait object
//! instead of being monomorphized per game.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use liku_game::{ErasedGameProtocol, Outcome, Slot};
use liku_registry::AgentId;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant as TokioInstant};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::{JoinOutcome, LeaveOutcome, MoveOutcome, SeatRequest, Session};
use crate::types::{EndReason, SessionId, SessionMode};

/// One broadcastable fact about a session, fanned out to every participant
/// (players and spectators alike — spectator pacing/throttling is a
/// concern of the broadcaster that sits downstream of this channel).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PlayerJoined { slot: Slot, agent_id: AgentId },
    SpectatorJoined { agent_id: AgentId, spectator_count: usize },
    GameStarted { state: Value, current_to_move: Option<Slot> },
    MoveMade { state: Value, slot: Slot, move_number: u32, current_to_move: Option<Slot> },
    GameEnded { outcome: Outcome, reason: EndReason },
    PlayerLeft { slot: Slot, agent_id: AgentId },
    SpectatorLeft { agent_id: AgentId, spectator_count: usize },
    TurnTimeout { slot: Slot },
    Rematch { state: Value },
}

pub type ParticipantSender = mpsc::UnboundedSender<SessionEvent>;

pub(crate) enum SessionCommand {
    Join {
        agent_id: AgentId,
        request: SeatRequest,
        sender: ParticipantSender,
        reply: oneshot::Sender<Result<JoinOutcome, SessionError>>,
    },
    Ready {
        agent_id: AgentId,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    SubmitMove {
        agent_id: AgentId,
        action: Value,
        reply: oneshot::Sender<Result<MoveOutcome, SessionError>>,
    },
    Leave {
        agent_id: AgentId,
        reply: oneshot::Sender<Result<LeaveOutcome, SessionError>>,
    },
    Rematch {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    GetInfo {
        reply: oneshot::Sender<SessionInfo>,
    },
    /// Registers a tap for every [`SessionEvent`] this session broadcasts,
    /// without taking a player or spectator seat. Used by the spectator
    /// broadcaster, which paces its own fanout downstream of this feed.
    Observe {
        sender: ParticipantSender,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub game_type: String,
    pub status: crate::config::SessionStatus,
    pub player_count: usize,
    pub spectator_count: usize,
    pub finished_ttl_elapsed: bool,
    pub current_to_move: Option<Slot>,
    pub state: Value,
}

#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn join(&self, agent_id: AgentId, request: SeatRequest, sender: ParticipantSender) -> Result<JoinOutcome, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Join { agent_id, request, sender, reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SessionError::Unavailable(self.session_id))?
    }

    pub async fn ready(&self, agent_id: AgentId) -> Result<bool, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Ready { agent_id, reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SessionError::Unavailable(self.session_id))?
    }

    pub async fn submit_move(&self, agent_id: AgentId, action: Value) -> Result<MoveOutcome, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::SubmitMove { agent_id, action, reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SessionError::Unavailable(self.session_id))?
    }

    pub async fn leave(&self, agent_id: AgentId) -> Result<LeaveOutcome, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Leave { agent_id, reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SessionError::Unavailable(self.session_id))?
    }

    pub async fn rematch(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Rematch { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SessionError::Unavailable(self.session_id))?
    }

    pub async fn get_info(&self) -> Result<SessionInfo, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id))?;
        reply_rx.await.map_err(|_| SessionError::Unavailable(self.session_id))
    }

    /// Registers `sender` to receive every [`SessionEvent`] this session
    /// broadcasts, without joining as a player or spectator.
    pub async fn observe(&self, sender: ParticipantSender) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Observe { sender })
            .await
            .map_err(|_| SessionError::Unavailable(self.session_id))
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.sender.send(SessionCommand::Shutdown).await.map_err(|_| SessionError::Unavailable(self.session_id))
    }
}

struct SessionActor {
    session: Session,
    senders: HashMap<AgentId, ParticipantSender>,
    observers: Vec<ParticipantSender>,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    async fn run(mut self) {
        let session_id = self.session.id;
        tracing::info!(%session_id, "session actor started");

        loop {
            let deadline = self.session.turn_deadline().map(TokioInstant::from);
            tokio::select! {
                cmd = self.receiver.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd) {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(|| TokioInstant::now() + Duration::from_secs(3600))), if deadline.is_some() => {
                    self.handle_turn_timeout();
                }
            }
        }

        tracing::info!(%session_id, "session actor stopped");
    }

    /// Returns `true` when the actor should stop its loop.
    fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::Join { agent_id, request, sender, reply } => {
                let result = self.handle_join(agent_id, request, sender);
                let _ = reply.send(result);
            }
            SessionCommand::Ready { agent_id, reply } => {
                let result = self.session.ready(agent_id, (SystemTime::now(), std::time::Instant::now()));
                if let Ok(true) = &result {
                    self.broadcast_all(SessionEvent::GameStarted {
                        state: self.session.rendered_state(),
                        current_to_move: self.session.current_to_move().cloned(),
                    });
                }
                let _ = reply.send(result);
            }
            SessionCommand::SubmitMove { agent_id, action, reply } => {
                let result = self.session.submit_move(agent_id, action, (SystemTime::now(), std::time::Instant::now()));
                if let Ok(outcome) = &result {
                    self.broadcast_move(outcome);
                }
                let _ = reply.send(result);
            }
            SessionCommand::Leave { agent_id, reply } => {
                let result = self.handle_leave(agent_id);
                let _ = reply.send(result);
            }
            SessionCommand::Rematch { reply } => {
                let result = self.session.rematch(SystemTime::now());
                if result.is_ok() {
                    self.broadcast_all(SessionEvent::Rematch { state: self.session.rendered_state() });
                }
                let _ = reply.send(result);
            }
            SessionCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            SessionCommand::Observe { sender } => {
                self.observers.push(sender);
            }
            SessionCommand::Shutdown => {
                tracing::info!(session_id = %self.session.id, "session shutting down");
                return true;
            }
        }
        false
    }

    fn handle_join(&mut self, agent_id: AgentId, request: SeatRequest, sender: ParticipantSender) -> Result<JoinOutcome, SessionError> {
        let result = self.session.join(agent_id, request, (SystemTime::now(), std::time::Instant::now()))?;
        self.senders.insert(agent_id, sender);
        match &result {
            JoinOutcome::Player { slot, autostarted } => {
                self.broadcast_all(SessionEvent::PlayerJoined { slot: slot.clone(), agent_id });
                if *autostarted {
                    self.broadcast_all(SessionEvent::GameStarted {
                        state: self.session.rendered_state(),
                        current_to_move: self.session.current_to_move().cloned(),
                    });
                }
            }
            JoinOutcome::Spectator { spectator_count } => {
                self.broadcast_all(SessionEvent::SpectatorJoined { agent_id, spectator_count: *spectator_count });
            }
        }
        Ok(result)
    }

    fn handle_leave(&mut self, agent_id: AgentId) -> Result<LeaveOutcome, SessionError> {
        let result = self.session.leave(agent_id, SystemTime::now())?;
        self.senders.remove(&agent_id);
        if result.was_player {
            if let Some(slot) = result.slot.clone() {
                self.broadcast_all(SessionEvent::PlayerLeft { slot, agent_id });
            }
            if let Some((outcome, reason)) = result.session_outcome.clone() {
                self.broadcast_all(SessionEvent::GameEnded { outcome, reason });
            }
        } else {
            self.broadcast_all(SessionEvent::SpectatorLeft { agent_id, spectator_count: result.spectator_count });
        }
        Ok(result)
    }

    fn handle_turn_timeout(&mut self) {
        let now = (SystemTime::now(), std::time::Instant::now());
        if let Some((slot, ended)) = self.session.apply_turn_timeout(now) {
            self.broadcast_all(SessionEvent::TurnTimeout { slot });
            if let Some((outcome, reason)) = ended {
                self.broadcast_all(SessionEvent::GameEnded { outcome, reason });
            }
        }
    }

    fn broadcast_move(&mut self, outcome: &MoveOutcome) {
        self.broadcast_all(SessionEvent::MoveMade {
            state: outcome.state.clone(),
            slot: outcome.slot.clone(),
            move_number: outcome.move_number,
            current_to_move: outcome.current_to_move.clone(),
        });
        if let Some(game_outcome) = &outcome.outcome {
            self.broadcast_all(SessionEvent::GameEnded { outcome: game_outcome.clone(), reason: EndReason::Normal });
        }
    }

    fn broadcast_all(&mut self, event: SessionEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
        self.observers.retain(|sender| sender.send(event.clone()).is_ok());
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session.id,
            game_type: self.session.game_type.clone(),
            status: self.session.status(),
            player_count: self.session.player_count(),
            spectator_count: self.session.spectator_count(),
            finished_ttl_elapsed: self.session.finished_ttl_elapsed(SystemTime::now()),
            current_to_move: self.session.current_to_move().cloned(),
            state: self.session.rendered_state(),
        }
    }
}

pub(crate) fn spawn_session(
    session_id: SessionId,
    game_type: String,
    mode: SessionMode,
    game: Box<dyn ErasedGameProtocol>,
    config: SessionConfig,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let session = Session::new(session_id, game_type, mode, game, config, SystemTime::now());

    let actor = SessionActor { session, senders: HashMap::new(), observers: Vec::new(), receiver: rx };

    tokio::spawn(actor.run());

    SessionHandle { session_id, sender: tx }
}
