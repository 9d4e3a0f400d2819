//! Tracks every live session and which agents belong to which.

use std::collections::HashMap;

use liku_game::GameRegistry;
use liku_registry::AgentId;

use crate::actor::{spawn_session, SessionHandle};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::types::{SessionId, SessionMode};

const DEFAULT_CHANNEL_SIZE: usize = 64;

pub struct SessionManager {
    registry: GameRegistry,
    sessions: HashMap<SessionId, SessionHandle>,
    /// An agent can spectate any number of sessions but play in at most
    /// one at a time — this tracks that one, if any.
    playing_in: HashMap<AgentId, SessionId>,
}

impl SessionManager {
    pub fn new(registry: GameRegistry) -> Self {
        Self { registry, sessions: HashMap::new(), playing_in: HashMap::new() }
    }

    pub fn create_session(&mut self, game_type: &str, mode: SessionMode, config: SessionConfig) -> Result<SessionId, SessionError> {
        let game = self.registry.create(game_type).ok_or_else(|| SessionError::UnknownGameType(game_type.to_string()))?;
        let session_id = SessionId::new();
        let handle = spawn_session(session_id, game_type.to_string(), mode, game, config, DEFAULT_CHANNEL_SIZE);
        self.sessions.insert(session_id, handle);
        Ok(session_id)
    }

    pub fn handle(&self, session_id: SessionId) -> Result<&SessionHandle, SessionError> {
        self.sessions.get(&session_id).ok_or(SessionError::NotFound(session_id))
    }

    /// Records that `agent_id` now occupies a player slot in `session_id`,
    /// enforcing the one-session-as-player invariant. Called by the
    /// connection layer after a successful join, since the manager itself
    /// doesn't see inside a join's seat request.
    pub fn bind_player(&mut self, agent_id: AgentId, session_id: SessionId) -> Result<(), SessionError> {
        if let Some(&existing) = self.playing_in.get(&agent_id) {
            if existing != session_id {
                return Err(SessionError::AlreadyInSession(agent_id));
            }
        }
        self.playing_in.insert(agent_id, session_id);
        Ok(())
    }

    pub fn unbind_player(&mut self, agent_id: AgentId) {
        self.playing_in.remove(&agent_id);
    }

    pub fn player_session(&self, agent_id: AgentId) -> Option<SessionId> {
        self.playing_in.get(&agent_id).copied()
    }

    pub fn destroy_session(&mut self, session_id: SessionId) -> Result<(), SessionError> {
        let handle = self.sessions.remove(&session_id).ok_or(SessionError::NotFound(session_id))?;
        self.playing_in.retain(|_, &mut s| s != session_id);
        tokio::spawn(async move {
            let _ = handle.shutdown().await;
        });
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    /// Evicts finished sessions whose configured TTL has elapsed. Returns
    /// the reaped session IDs. Intended to be driven by a periodic sweep
    /// in the top-level hub.
    pub async fn reap_finished(&mut self) -> Vec<SessionId> {
        let mut reaped = Vec::new();
        for (&id, handle) in self.sessions.iter() {
            if let Ok(info) = handle.get_info().await {
                if info.status == crate::config::SessionStatus::Finished && info.finished_ttl_elapsed {
                    reaped.push(id);
                }
            }
        }
        for id in &reaped {
            let _ = self.destroy_session(*id);
        }
        reaped
    }
}

#[cfg(test)]
mod tests {
    use liku_game::tic_tac_toe::{Config, TicTacToe};
    use liku_game::Erased;

    use super::*;

    fn registry() -> GameRegistry {
        let mut registry = GameRegistry::new();
        registry.register("tic_tac_toe", || Box::new(Erased::<TicTacToe>::new(Config)));
        registry
    }

    #[test]
    fn test_create_session_with_unknown_game_type_fails() {
        let mut manager = SessionManager::new(registry());
        let err = manager.create_session("chess", SessionMode::HumanVsHuman, SessionConfig::default()).unwrap_err();
        assert!(matches!(err, SessionError::UnknownGameType(_)));
    }

    #[test]
    fn test_create_session_with_known_game_type_succeeds() {
        let mut manager = SessionManager::new(registry());
        let id = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, SessionConfig::default()).unwrap();
        assert_eq!(manager.session_count(), 1);
        assert!(manager.handle(id).is_ok());
    }

    #[test]
    fn test_bind_player_rejects_a_second_concurrent_session() {
        let mut manager = SessionManager::new(registry());
        let a = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, SessionConfig::default()).unwrap();
        let b = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, SessionConfig::default()).unwrap();
        let agent = AgentId::new();
        manager.bind_player(agent, a).unwrap();
        let err = manager.bind_player(agent, b).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyInSession(_)));
    }

    #[test]
    fn test_unbind_player_clears_the_invariant() {
        let mut manager = SessionManager::new(registry());
        let a = manager.create_session("tic_tac_toe", SessionMode::HumanVsHuman, SessionConfig::default()).unwrap();
        let agent = AgentId::new();
        manager.bind_player(agent, a).unwrap();
        manager.unbind_player(agent);
        assert_eq!(manager.player_session(agent), None);
    }
}
