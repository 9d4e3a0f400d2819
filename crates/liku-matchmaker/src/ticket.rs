//! A waiting room for strangers: one ticket per hosted game, keyed by its
//! short code.

use std::time::{Duration, SystemTime};

use liku_registry::AgentId;
use liku_session::SessionId;

/// Default ticket lifetime per spec.md §4.6.
pub const DEFAULT_TICKET_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct MatchTicket {
    pub code: String,
    pub game_type: String,
    pub host: AgentId,
    pub host_display_name: String,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
    /// `None` until [`super::Matchmaker::join`] pairs a guest into a session.
    pub session_id: Option<SessionId>,
}

impl MatchTicket {
    pub fn new(code: String, game_type: String, host: AgentId, host_display_name: String, now: SystemTime, ttl: Duration) -> Self {
        Self { code, game_type, host, host_display_name, created_at: now, expires_at: now + ttl, session_id: None }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    pub fn is_waiting(&self) -> bool {
        self.session_id.is_none()
    }
}
