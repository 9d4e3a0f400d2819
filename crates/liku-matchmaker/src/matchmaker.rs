//! Pairs strangers by short code into a freshly dealt session.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use liku_game::Slot;
use liku_registry::AgentId;
use liku_session::{ParticipantSender, SeatRequest, SessionConfig, SessionId, SessionManager, SessionMode, SlotAssignmentPolicy, StartPlayerPolicy};

use crate::code::{self, normalize};
use crate::error::MatchError;
use crate::ticket::{MatchTicket, DEFAULT_TICKET_TTL};

/// The slots assigned to each side and who goes first, reported once a
/// `join` pairs a ticket into a live session.
#[derive(Debug, Clone)]
pub struct MatchFound {
    pub session_id: SessionId,
    pub code: String,
    pub host_slot: Slot,
    pub guest_slot: Slot,
    pub starting_slot: Option<Slot>,
}

/// A ticket summary safe to hand back from [`Matchmaker::list`] — it never
/// reveals a code other than the caller's own via another channel.
#[derive(Debug, Clone)]
pub struct TicketSummary {
    pub code: String,
    pub game_type: String,
    pub host: AgentId,
    pub host_display_name: String,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

impl From<&MatchTicket> for TicketSummary {
    fn from(ticket: &MatchTicket) -> Self {
        Self {
            code: ticket.code.clone(),
            game_type: ticket.game_type.clone(),
            host: ticket.host,
            host_display_name: ticket.host_display_name.clone(),
            created_at: ticket.created_at,
            expires_at: ticket.expires_at,
        }
    }
}

pub struct Matchmaker {
    tickets: HashMap<String, MatchTicket>,
    ticket_ttl: Duration,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self { tickets: HashMap::new(), ticket_ttl: DEFAULT_TICKET_TTL }
    }

    pub fn with_ticket_ttl(ticket_ttl: Duration) -> Self {
        Self { tickets: HashMap::new(), ticket_ttl }
    }

    /// Opens a ticket for `host` and returns its short code. A host may hold
    /// any number of simultaneous tickets; the command router is expected
    /// to enforce "one active ticket per game type" if it wants that.
    pub fn host(&mut self, host: AgentId, host_display_name: String, game_type: String, now: SystemTime) -> MatchTicket {
        let code = loop {
            let candidate = code::generate();
            if !self.tickets.contains_key(&candidate) {
                break candidate;
            }
        };
        let ticket = MatchTicket::new(code.clone(), game_type, host, host_display_name, now, self.ticket_ttl);
        self.tickets.insert(code, ticket.clone());
        ticket
    }

    /// Resolves `code`, creates a session with a freshly shuffled slot
    /// mapping, joins both parties as players, readies them, and links the
    /// session back into the ticket.
    pub async fn join(
        &mut self,
        code: &str,
        guest: AgentId,
        host_sender: ParticipantSender,
        guest_sender: ParticipantSender,
        sessions: &mut SessionManager,
        now: SystemTime,
    ) -> Result<MatchFound, MatchError> {
        let normalized = normalize(code);
        let ticket = self.tickets.get_mut(&normalized).ok_or(MatchError::NotFound)?;

        if ticket.is_expired(now) {
            return Err(MatchError::Expired);
        }
        if !ticket.is_waiting() {
            return Err(MatchError::AlreadyMatched);
        }
        if ticket.host == guest {
            return Err(MatchError::SelfJoin);
        }

        let config = SessionConfig {
            start_player_policy: StartPlayerPolicy::Random,
            slot_assignment_policy: SlotAssignmentPolicy::Random,
            ..SessionConfig::default()
        };
        let session_id = sessions.create_session(&ticket.game_type, SessionMode::HumanVsHuman, config)?;
        let handle = sessions.handle(session_id)?.clone();

        let host_outcome = handle.join(ticket.host, SeatRequest::Player { preferred_slot: None }, host_sender).await?;
        let guest_outcome = handle.join(guest, SeatRequest::Player { preferred_slot: None }, guest_sender).await?;

        let host_slot = match host_outcome {
            liku_session::JoinOutcome::Player { slot, .. } => slot,
            liku_session::JoinOutcome::Spectator { .. } => unreachable!("matchmaker always requests a player seat"),
        };
        let guest_slot = match guest_outcome {
            liku_session::JoinOutcome::Player { slot, .. } => slot,
            liku_session::JoinOutcome::Spectator { .. } => unreachable!("matchmaker always requests a player seat"),
        };

        handle.ready(ticket.host).await?;
        handle.ready(guest).await?;

        sessions.bind_player(ticket.host, session_id)?;
        sessions.bind_player(guest, session_id)?;

        let info = handle.get_info().await?;
        ticket.session_id = Some(session_id);

        Ok(MatchFound { session_id, code: ticket.code.clone(), host_slot, guest_slot, starting_slot: info.current_to_move })
    }

    /// Only the host may cancel, and only while the ticket is still waiting.
    pub fn cancel(&mut self, code: &str, caller: AgentId) -> Result<(), MatchError> {
        let normalized = normalize(code);
        let ticket = self.tickets.get(&normalized).ok_or(MatchError::NotFound)?;
        if ticket.host != caller {
            return Err(MatchError::NotHost);
        }
        if !ticket.is_waiting() {
            return Err(MatchError::AlreadyMatched);
        }
        self.tickets.remove(&normalized);
        Ok(())
    }

    /// Waiting tickets excluding those owned by `caller`, for browsing.
    pub fn list(&self, caller: AgentId, now: SystemTime) -> Vec<TicketSummary> {
        self.tickets
            .values()
            .filter(|t| t.is_waiting() && !t.is_expired(now) && t.host != caller)
            .map(TicketSummary::from)
            .collect()
    }

    /// Removes every expired ticket, returning their codes. Intended to be
    /// driven by a periodic sweep in the top-level hub.
    pub fn sweep_expired(&mut self, now: SystemTime) -> Vec<String> {
        let expired: Vec<String> = self.tickets.values().filter(|t| t.is_expired(now)).map(|t| t.code.clone()).collect();
        for code in &expired {
            self.tickets.remove(code);
        }
        expired
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new()
    }
}
