//! Agent identity and the counters the hub feeds into it.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use liku_protocol::{AgentRole, AgentType};
use liku_transport::ConnectionId;
use uuid::Uuid;

/// Stable identity allocated on an agent's first registration, carried
/// across reconnects within the same process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Reconstructs an [`AgentId`] from its wire form — the uuid a prior
    /// event (e.g. `player_joined`) handed the client in an `agentId`
    /// field. Does not itself confirm the agent is still registered; a
    /// caller that needs that should follow up with [`super::AgentRegistry::get`].
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Sentinel id for messages attributed to the server itself rather
    /// than any registered agent (e.g. chat system notices).
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered client identity. May hold more than one live connection.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub display_name: String,
    pub agent_type: AgentType,
    pub role: AgentRole,
    pub connections: HashSet<ConnectionId>,
    pub commands_issued: u64,
    pub queries_issued: u64,
    /// Running mean of command latency in milliseconds.
    pub mean_latency_ms: f64,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl Agent {
    pub(crate) fn new(id: AgentId, display_name: String, agent_type: AgentType, role: AgentRole, connection_id: ConnectionId, now: Instant) -> Self {
        let mut connections = HashSet::new();
        connections.insert(connection_id);
        Self {
            id,
            display_name,
            agent_type,
            role,
            connections,
            commands_issued: 0,
            queries_issued: 0,
            mean_latency_ms: 0.0,
            created_at: now,
            last_activity: now,
        }
    }

    /// Folds one more observed command latency into the running mean.
    pub(crate) fn record_command(&mut self, latency_ms: f64, now: Instant) {
        self.commands_issued += 1;
        let n = self.commands_issued as f64;
        self.mean_latency_ms += (latency_ms - self.mean_latency_ms) / n;
        self.last_activity = now;
    }

    pub(crate) fn record_query(&mut self, now: Instant) {
        self.queries_issued += 1;
        self.last_activity = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_display_is_canonical_uuid_form() {
        let id = AgentId::new();
        assert_eq!(id.to_string().len(), 36);
    }

    #[test]
    fn test_record_command_updates_running_mean() {
        let now = Instant::now();
        let mut agent = Agent::new(AgentId::new(), "alice".into(), AgentType::Human, AgentRole::Player, ConnectionId::new(1), now);
        agent.record_command(10.0, now);
        agent.record_command(20.0, now);
        assert_eq!(agent.commands_issued, 2);
        assert_eq!(agent.mean_latency_ms, 15.0);
    }
}
