//! The agent registry: stable identities assigned from connection
//! credentials, tracked role and session membership lookups, liveness.

use std::collections::HashMap;
use std::time::Instant;

use liku_protocol::{AgentRole, AgentType};
use liku_transport::ConnectionId;

use crate::agent::{Agent, AgentId};
use crate::error::RegistryError;

/// Holds every registered [`Agent`], indexed by id, connection, and
/// rebind token.
///
/// Grounded on the same `HashMap`-plus-secondary-index manager shape the
/// rest of this workspace's registries use: one map owns the records, a
/// second gives O(1) lookup by the key callers actually have in hand.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, Agent>,
    by_connection: HashMap<ConnectionId, AgentId>,
    by_token: HashMap<String, AgentId>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection under an agent identity. If `token` resolves
    /// to an existing agent, that identity is rebound (the connection is
    /// added to it); otherwise a fresh identity is allocated and, if a
    /// token was supplied, indexed for future rebinds.
    pub fn register(
        &mut self,
        token: Option<&str>,
        display_name: String,
        agent_type: AgentType,
        role: AgentRole,
        connection_id: ConnectionId,
        now: Instant,
    ) -> AgentId {
        if let Some(token) = token {
            if let Some(&existing_id) = self.by_token.get(token) {
                let agent = self.agents.get_mut(&existing_id).expect("by_token index out of sync");
                agent.connections.insert(connection_id);
                agent.last_activity = now;
                self.by_connection.insert(connection_id, existing_id);
                tracing::debug!(agent_id = %existing_id, %connection_id, "rebound agent to new connection");
                return existing_id;
            }
        }

        let id = AgentId::new();
        let agent = Agent::new(id, display_name, agent_type, role, connection_id, now);
        self.agents.insert(id, agent);
        self.by_connection.insert(connection_id, id);
        if let Some(token) = token {
            self.by_token.insert(token.to_string(), id);
        }
        tracing::info!(agent_id = %id, %connection_id, "registered new agent");
        id
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn lookup_by_connection(&self, connection_id: ConnectionId) -> Option<AgentId> {
        self.by_connection.get(&connection_id).copied()
    }

    /// Removes `connection_id` from its agent's connection set. Returns the
    /// number of connections the agent has left, so the caller (the
    /// connection hub) can decide whether the agent is now a teardown
    /// candidate per the rule in spec.md §3 — the registry itself never
    /// decides to tear an agent down, since that also depends on session
    /// membership it has no visibility into.
    pub fn unbind_connection(&mut self, connection_id: ConnectionId) -> Result<(AgentId, usize), RegistryError> {
        let Some(agent_id) = self.by_connection.remove(&connection_id) else {
            return Err(RegistryError::ConnectionNotFound(connection_id));
        };
        let agent = self.agents.get_mut(&agent_id).ok_or(RegistryError::NotFound(agent_id))?;
        agent.connections.remove(&connection_id);
        Ok((agent_id, agent.connections.len()))
    }

    /// Permanently removes an agent record. Callers must have already
    /// confirmed the agent has no open connections and no non-terminal
    /// session membership.
    pub fn remove(&mut self, id: AgentId) -> Result<(), RegistryError> {
        let agent = self.agents.remove(&id).ok_or(RegistryError::NotFound(id))?;
        for connection_id in agent.connections {
            self.by_connection.remove(&connection_id);
        }
        self.by_token.retain(|_, v| *v != id);
        tracing::info!(agent_id = %id, "agent torn down");
        Ok(())
    }

    /// Records one command's observed latency, folding it into the
    /// agent's running mean.
    pub fn record_command(&mut self, id: AgentId, latency_ms: f64, now: Instant) -> Result<(), RegistryError> {
        let agent = self.agents.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        agent.record_command(latency_ms, now);
        Ok(())
    }

    pub fn record_query(&mut self, id: AgentId, now: Instant) -> Result<(), RegistryError> {
        let agent = self.agents.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
        agent.record_query(now);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    #[test]
    fn test_register_without_token_allocates_fresh_identity() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let a = registry.register(None, "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        let b = registry.register(None, "bob".into(), AgentType::Human, AgentRole::Player, conn(2), now);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_with_known_token_rebinds_existing_agent() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let first = registry.register(Some("tok-1"), "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        let second = registry.register(Some("tok-1"), "alice".into(), AgentType::Human, AgentRole::Player, conn(2), now);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        let agent = registry.get(first).unwrap();
        assert_eq!(agent.connections.len(), 2);
    }

    #[test]
    fn test_register_with_unknown_token_allocates_and_indexes() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let id = registry.register(Some("tok-new"), "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        let rebound = registry.register(Some("tok-new"), "ignored".into(), AgentType::Human, AgentRole::Player, conn(2), now);
        assert_eq!(id, rebound);
    }

    #[test]
    fn test_lookup_by_connection_resolves_agent() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let id = registry.register(None, "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        assert_eq!(registry.lookup_by_connection(conn(1)), Some(id));
        assert_eq!(registry.lookup_by_connection(conn(99)), None);
    }

    #[test]
    fn test_unbind_connection_reports_remaining_count() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let id = registry.register(Some("tok"), "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        registry.register(Some("tok"), "alice".into(), AgentType::Human, AgentRole::Player, conn(2), now);

        let (unbound_id, remaining) = registry.unbind_connection(conn(1)).unwrap();
        assert_eq!(unbound_id, id);
        assert_eq!(remaining, 1);

        let (_, remaining) = registry.unbind_connection(conn(2)).unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_remove_clears_all_indices() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let id = registry.register(Some("tok"), "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        registry.remove(id).unwrap();
        assert!(registry.get(id).is_none());
        assert_eq!(registry.lookup_by_connection(conn(1)), None);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_remove_unknown_agent_errors() {
        let mut registry = AgentRegistry::new();
        assert!(registry.remove(crate::agent::AgentId::new()).is_err());
    }

    #[test]
    fn test_record_command_updates_agent_counters() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let id = registry.register(None, "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        registry.record_command(id, 42.0, now).unwrap();
        assert_eq!(registry.get(id).unwrap().commands_issued, 1);
    }

    #[test]
    fn test_record_query_updates_agent_counters() {
        let mut registry = AgentRegistry::new();
        let now = Instant::now();
        let id = registry.register(None, "alice".into(), AgentType::Human, AgentRole::Player, conn(1), now);
        registry.record_query(id, now).unwrap();
        assert_eq!(registry.get(id).unwrap().queries_issued, 1);
    }
}
