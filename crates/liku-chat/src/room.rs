//! One chat channel: participants, bounded history, and reactions.

use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

use liku_registry::AgentId;

use crate::error::ChatError;
use crate::message::{ChatMessage, MessageId};
use crate::types::{Participant, ReactionMap, RoomId, RoomSettings, RoomType};

pub struct ChatRoom {
    pub id: RoomId,
    pub display_name: String,
    pub room_type: RoomType,
    pub participants: HashMap<AgentId, Participant>,
    pub settings: RoomSettings,
    history: VecDeque<ChatMessage>,
    reactions: ReactionMap,
}

impl ChatRoom {
    pub fn new(id: RoomId, display_name: String, room_type: RoomType, settings: RoomSettings) -> Self {
        Self { id, display_name, room_type, participants: HashMap::new(), settings, history: VecDeque::new(), reactions: HashMap::new() }
    }

    pub fn participant(&self, agent_id: AgentId) -> Result<&Participant, ChatError> {
        self.participants.get(&agent_id).ok_or(ChatError::NotInRoom(agent_id))
    }

    pub fn add_participant(&mut self, agent_id: AgentId, participant: Participant) -> Result<(), ChatError> {
        if self.participants.contains_key(&agent_id) {
            return Err(ChatError::AlreadyInRoom(agent_id));
        }
        if self.participants.len() >= self.settings.max_participants {
            return Err(ChatError::RoomFull);
        }
        self.participants.insert(agent_id, participant);
        Ok(())
    }

    pub fn remove_participant(&mut self, agent_id: AgentId) -> Result<(), ChatError> {
        self.participants.remove(&agent_id).ok_or(ChatError::NotInRoom(agent_id)).map(|_| ())
    }

    /// Appends `message` to history, trimming the oldest entry (and its
    /// reactions) once `retention_count` is crossed.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.history.push_back(message);
        while self.history.len() > self.settings.retention_count {
            if let Some(dropped) = self.history.pop_front() {
                self.reactions.remove(&dropped.id);
            }
        }
    }

    pub fn history(&self) -> &VecDeque<ChatMessage> {
        &self.history
    }

    pub fn contains_message(&self, message_id: MessageId) -> bool {
        self.history.iter().any(|m| m.id == message_id)
    }

    pub fn delete_message(&mut self, message_id: MessageId) -> Result<(), ChatError> {
        let before = self.history.len();
        self.history.retain(|m| m.id != message_id);
        if self.history.len() == before {
            return Err(ChatError::MessageNotFound(message_id));
        }
        self.reactions.remove(&message_id);
        Ok(())
    }

    pub fn add_reaction(&mut self, message_id: MessageId, user: AgentId, emoji: String) -> Result<(), ChatError> {
        if !self.contains_message(message_id) {
            return Err(ChatError::MessageNotFound(message_id));
        }
        self.reactions.entry(message_id).or_default().push(crate::types::Reaction { user, emoji });
        Ok(())
    }

    pub fn remove_reaction(&mut self, message_id: MessageId, user: AgentId, emoji: &str) -> Result<(), ChatError> {
        let Some(list) = self.reactions.get_mut(&message_id) else {
            return Err(ChatError::MessageNotFound(message_id));
        };
        list.retain(|r| !(r.user == user && r.emoji == emoji));
        Ok(())
    }

    pub fn reactions_for(&self, message_id: MessageId) -> &[crate::types::Reaction] {
        self.reactions.get(&message_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn mute(&mut self, target: AgentId, until: SystemTime, caller_role: crate::types::ParticipantRole) -> Result<(), ChatError> {
        self.assert_can_moderate(target, caller_role)?;
        let participant = self.participants.get_mut(&target).ok_or(ChatError::NotInRoom(target))?;
        participant.mute_expiry = Some(until);
        Ok(())
    }

    pub fn unmute(&mut self, target: AgentId, caller_role: crate::types::ParticipantRole) -> Result<(), ChatError> {
        if !caller_role.is_moderator_or_above() {
            return Err(ChatError::PermissionDenied);
        }
        let participant = self.participants.get_mut(&target).ok_or(ChatError::NotInRoom(target))?;
        participant.mute_expiry = None;
        Ok(())
    }

    pub fn kick(&mut self, target: AgentId, caller_role: crate::types::ParticipantRole) -> Result<(), ChatError> {
        self.assert_can_moderate(target, caller_role)?;
        self.remove_participant(target)
    }

    /// Moderators and owners can't be muted or kicked by a peer moderator;
    /// only the owner may act on a moderator, per spec.md §4.8.
    fn assert_can_moderate(&self, target: AgentId, caller_role: crate::types::ParticipantRole) -> Result<(), ChatError> {
        if !caller_role.is_moderator_or_above() {
            return Err(ChatError::PermissionDenied);
        }
        let target_role = self.participants.get(&target).ok_or(ChatError::NotInRoom(target))?.role;
        if target_role.is_moderator_or_above() && caller_role != crate::types::ParticipantRole::Owner {
            return Err(ChatError::PermissionDenied);
        }
        Ok(())
    }
}
