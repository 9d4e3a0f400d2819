//! The session state machine: join, ready, submit-move, leave, rematch.
//!
//! All of a session's mutable state lives behind [`SessionActor`]
//! (`actor.rs`), which serializes every operation through one channel — so
//! the methods here never need their own locking. They are plain,
//! synchronous, and unit-testable in isolation from tokio.

use std::collections::{HashMap, HashSet};
use std::time::{Instant, SystemTime};

use liku_game::{ErasedGameProtocol, Outcome, Slot};
use liku_registry::AgentId;
use rand::Rng;
use serde_json::Value;

use crate::config::{SessionConfig, SessionStatus, SlotAssignmentPolicy, StartPlayerPolicy};
use crate::error::SessionError;
use crate::turn::TurnManager;
use crate::types::{EndReason, MoveRecord, SessionId, SessionMode};

/// What a joining agent wants to be.
#[derive(Debug, Clone)]
pub enum SeatRequest {
    Player { preferred_slot: Option<Slot> },
    Spectator,
}

#[derive(Debug, Clone)]
pub enum JoinOutcome {
    Player { slot: Slot, autostarted: bool },
    Spectator { spectator_count: usize },
}

#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub slot: Slot,
    pub state: Value,
    pub move_number: u32,
    pub outcome: Option<Outcome>,
    pub current_to_move: Option<Slot>,
}

#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub was_player: bool,
    pub slot: Option<Slot>,
    pub session_outcome: Option<(Outcome, EndReason)>,
    pub spectator_count: usize,
}

pub struct Session {
    pub id: SessionId,
    pub game_type: String,
    pub mode: SessionMode,
    config: SessionConfig,
    game: Box<dyn ErasedGameProtocol>,
    slots: Vec<Slot>,
    players: HashMap<Slot, AgentId>,
    ready: HashSet<Slot>,
    spectators: HashSet<AgentId>,
    state: Value,
    history: Vec<MoveRecord>,
    status: SessionStatus,
    current_to_move: Option<Slot>,
    outcome: Option<(Outcome, EndReason)>,
    created_at: SystemTime,
    started_at: Option<SystemTime>,
    ended_at: Option<SystemTime>,
    turn: TurnManager,
    last_starting_slot: Option<Slot>,
    next_start_override: Option<Slot>,
}

impl Session {
    pub fn new(id: SessionId, game_type: String, mode: SessionMode, game: Box<dyn ErasedGameProtocol>, config: SessionConfig, now: SystemTime) -> Self {
        let slots = game.slots();
        let state = game.initial_state();
        let turn = TurnManager::new(slots.clone());
        Self {
            id,
            game_type,
            mode,
            config,
            game,
            slots,
            players: HashMap::new(),
            ready: HashSet::new(),
            spectators: HashSet::new(),
            state,
            history: Vec::new(),
            status: SessionStatus::Waiting,
            current_to_move: None,
            outcome: None,
            created_at: now,
            started_at: None,
            ended_at: None,
            turn,
            last_starting_slot: None,
            next_start_override: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn rendered_state(&self) -> Value {
        self.game.render(&self.state)
    }

    pub fn slot_of(&self, agent_id: AgentId) -> Option<&Slot> {
        self.players.iter().find(|&(_, &a)| a == agent_id).map(|(slot, _)| slot)
    }

    pub fn is_spectator(&self, agent_id: AgentId) -> bool {
        self.spectators.contains(&agent_id)
    }

    pub fn spectator_count(&self) -> usize {
        self.spectators.len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn turn_deadline(&self) -> Option<Instant> {
        self.turn.deadline()
    }

    pub fn current_to_move(&self) -> Option<&Slot> {
        self.current_to_move.as_ref()
    }

    pub fn join(&mut self, agent_id: AgentId, request: SeatRequest, now: (SystemTime, Instant)) -> Result<JoinOutcome, SessionError> {
        match request {
            SeatRequest::Player { preferred_slot } => self.join_as_player(agent_id, preferred_slot, now),
            SeatRequest::Spectator => self.join_as_spectator(agent_id),
        }
    }

    fn join_as_player(&mut self, agent_id: AgentId, preferred_slot: Option<Slot>, now: (SystemTime, Instant)) -> Result<JoinOutcome, SessionError> {
        if !self.status.is_joinable() {
            return Err(SessionError::AlreadyStarted);
        }
        if self.players.values().any(|&a| a == agent_id) {
            return Err(SessionError::AlreadyInSession(agent_id));
        }

        let free: Vec<&Slot> = self.slots.iter().filter(|s| !self.players.contains_key(*s)).collect();
        if free.is_empty() {
            return Err(SessionError::NoFreeSlot);
        }

        let slot = match self.config.slot_assignment_policy {
            SlotAssignmentPolicy::PreferRequested => preferred_slot
                .filter(|s| free.contains(&s))
                .unwrap_or_else(|| free[0].clone()),
            SlotAssignmentPolicy::Random => {
                let idx = rand::rng().random_range(0..free.len());
                free[idx].clone()
            }
        };

        self.players.insert(slot.clone(), agent_id);
        let autostarted = self.try_autostart(now);
        Ok(JoinOutcome::Player { slot, autostarted })
    }

    fn join_as_spectator(&mut self, agent_id: AgentId) -> Result<JoinOutcome, SessionError> {
        if !self.config.spectator_allowed {
            return Err(SessionError::SpectatorsDisallowed);
        }
        if self.spectators.len() >= self.config.max_spectators {
            return Err(SessionError::NoFreeSlot);
        }
        self.spectators.insert(agent_id);
        Ok(JoinOutcome::Spectator { spectator_count: self.spectators.len() })
    }

    pub fn ready(&mut self, agent_id: AgentId, now: (SystemTime, Instant)) -> Result<bool, SessionError> {
        if self.status.is_active() || self.status == SessionStatus::Finished {
            return Err(SessionError::AlreadyStarted);
        }
        let slot = self.slot_of(agent_id).cloned().ok_or(SessionError::NotAPlayer(agent_id))?;
        self.ready.insert(slot);
        Ok(self.try_autostart(now))
    }

    fn try_autostart(&mut self, (wall_now, clock_now): (SystemTime, Instant)) -> bool {
        if self.status.is_active() || self.status == SessionStatus::Finished {
            return false;
        }
        if !self.config.autostart {
            self.status = SessionStatus::Ready;
            return false;
        }
        if self.players.len() != self.slots.len() || self.ready.len() != self.slots.len() {
            return false;
        }

        let starting = self.next_start_override.take().unwrap_or_else(|| match &self.config.start_player_policy {
            StartPlayerPolicy::Explicit(slot) => slot.clone(),
            StartPlayerPolicy::Random => {
                let idx = rand::rng().random_range(0..self.slots.len());
                self.slots[idx].clone()
            }
        });

        self.current_to_move = Some(starting.clone());
        self.last_starting_slot = Some(starting);
        self.status = SessionStatus::Playing;
        self.started_at = Some(wall_now);
        self.turn.start_timer(self.config.turn_time_budget, clock_now);
        true
    }

    /// The eight-step submit-move sequence, run to completion under the
    /// caller's exclusive access (the actor owns the only `&mut Session`).
    pub fn submit_move(&mut self, agent_id: AgentId, action: Value, now: (SystemTime, Instant)) -> Result<MoveOutcome, SessionError> {
        // 1. resolve the caller to a slot.
        let slot = self.slot_of(agent_id).cloned().ok_or(SessionError::NotAPlayer(agent_id))?;

        // 2. session must be in progress.
        if self.status != SessionStatus::Playing {
            return Err(SessionError::NotInProgress);
        }

        // 3. it must be this slot's turn.
        if self.current_to_move.as_ref() != Some(&slot) {
            return Err(SessionError::NotYourTurn(slot));
        }

        // 4. game-specific legality.
        if !self.game.is_legal(&self.state, &slot, &action) {
            return Err(SessionError::IllegalMove("move rejected by game rules".into()));
        }

        // 5. mutate state: apply, record history.
        let (next_state, result) = self.game.apply_action(&self.state, &slot, &action)?;
        self.state = next_state;
        let move_number = self.history.len() as u32 + 1;
        self.history.push(MoveRecord { slot: slot.clone(), action, move_number });

        // 6 & 7: the game already ordered win-before-draw in its own
        // terminal check; we only branch on whether it produced one.
        self.current_to_move = self.game.next_to_move(&self.state);

        // 8. emit terminal transition, or rearm the turn clock.
        let (wall_now, clock_now) = now;
        if let Some(outcome) = result.outcome.clone() {
            self.status = SessionStatus::Finished;
            self.ended_at = Some(wall_now);
            self.turn.cancel_timer();
            self.outcome = Some((outcome, EndReason::Normal));
        } else {
            self.turn.start_timer(self.config.turn_time_budget, clock_now);
        }

        Ok(MoveOutcome {
            slot,
            state: self.state.clone(),
            move_number,
            outcome: result.outcome,
            current_to_move: self.current_to_move.clone(),
        })
    }

    /// A player leaving an active two-slot session forfeits to the other
    /// slot. Sessions with more than two slots have no defined forfeit
    /// winner yet — the leaving slot is simply vacated.
    pub fn leave(&mut self, agent_id: AgentId, now: SystemTime) -> Result<LeaveOutcome, SessionError> {
        if let Some(slot) = self.slot_of(agent_id).cloned() {
            let mut session_outcome = None;
            if self.status.is_active() && self.slots.len() == 2 {
                let other = self.slots.iter().find(|s| **s != slot).cloned();
                if let Some(other) = other {
                    let outcome = Outcome::Win { slot: other, winning_line: None };
                    self.outcome = Some((outcome.clone(), EndReason::Forfeit));
                    session_outcome = Some((outcome, EndReason::Forfeit));
                    self.status = SessionStatus::Finished;
                    self.ended_at = Some(now);
                    self.current_to_move = None;
                    self.turn.cancel_timer();
                }
            }
            self.players.remove(&slot);
            self.ready.remove(&slot);
            self.turn.remove_slot(&slot);
            Ok(LeaveOutcome { was_player: true, slot: Some(slot), session_outcome, spectator_count: self.spectators.len() })
        } else if self.spectators.remove(&agent_id) {
            Ok(LeaveOutcome { was_player: false, slot: None, session_outcome: None, spectator_count: self.spectators.len() })
        } else {
            Err(SessionError::NotInSession(agent_id))
        }
    }

    /// Applies a turn-timeout per the configured policy. Returns the slot
    /// that timed out, if any action was taken.
    pub fn apply_turn_timeout(&mut self, now: (SystemTime, Instant)) -> Option<(Slot, Option<(Outcome, EndReason)>)> {
        let slot = self.current_to_move.clone()?;
        match self.config.turn_timeout_policy {
            crate::config::TurnTimeoutPolicy::Forfeit => {
                let agent = *self.players.get(&slot)?;
                let outcome = self.leave(agent, now.0).ok()?;
                Some((slot, outcome.session_outcome))
            }
            crate::config::TurnTimeoutPolicy::SkipTurn => {
                self.current_to_move = self.turn.slots().iter().find(|s| **s != slot).cloned().or(Some(slot.clone()));
                self.turn.start_timer(self.config.turn_time_budget, now.1);
                Some((slot, None))
            }
        }
    }

    /// Resets the board for another round with the same two bound agents.
    pub fn rematch(&mut self, now: SystemTime) -> Result<(), SessionError> {
        if self.status != SessionStatus::Finished {
            return Err(SessionError::NotFinished);
        }

        let prior_starting_agent = self.last_starting_slot.as_ref().and_then(|slot| self.players.get(slot).copied());

        if self.config.rematch_policy.swap_slots && self.slots.len() == 2 {
            let (a, b) = (self.slots[0].clone(), self.slots[1].clone());
            let pa = self.players.remove(&a);
            let pb = self.players.remove(&b);
            if let Some(pb) = pb {
                self.players.insert(a, pb);
            }
            if let Some(pa) = pa {
                self.players.insert(b, pa);
            }
        }

        self.next_start_override = if self.config.rematch_policy.reroll_starter {
            None
        } else {
            prior_starting_agent.and_then(|agent| self.slot_of(agent).cloned())
        };

        self.state = self.game.initial_state();
        self.history.clear();
        self.ready.clear();
        self.outcome = None;
        self.status = SessionStatus::Waiting;
        self.current_to_move = None;
        self.started_at = None;
        self.ended_at = None;
        self.created_at = now;
        self.turn = TurnManager::new(self.slots.clone());
        Ok(())
    }

    pub fn ended_at(&self) -> Option<SystemTime> {
        self.ended_at
    }

    pub fn finished_ttl_elapsed(&self, now: SystemTime) -> bool {
        match self.ended_at {
            Some(ended) => now.duration_since(ended).unwrap_or_default() >= self.config.finished_ttl,
            None => false,
        }
    }
}
