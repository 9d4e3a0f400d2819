//! Ties rooms, messages, and rate limiting together into the one surface
//! the hub drives, generalized from `arcforge-room::RoomManager`'s
//! plain-struct bookkeeping (no actor, no task — chat has no cadence of
//! its own).

use std::collections::HashMap;
use std::time::{Instant, SystemTime};

use liku_registry::AgentId;
use serde_json::Value;

use crate::error::ChatError;
use crate::event::ChatEvent;
use crate::message::{validate_content, ChatMessage, MessageId, MessageKind};
use crate::ratelimit::{ChatRateConfig, ChatRateLimiter};
use crate::room::ChatRoom;
use crate::types::{Participant, ParticipantRole, RoomId, RoomSettings, RoomType};

pub struct ChatManager {
    rooms: HashMap<RoomId, ChatRoom>,
    limiters: HashMap<(RoomId, AgentId), ChatRateLimiter>,
    rate_config: ChatRateConfig,
}

impl ChatManager {
    pub fn new() -> Self {
        Self { rooms: HashMap::new(), limiters: HashMap::new(), rate_config: ChatRateConfig::default() }
    }

    pub fn with_rate_config(rate_config: ChatRateConfig) -> Self {
        Self { rooms: HashMap::new(), limiters: HashMap::new(), rate_config }
    }

    pub fn create_room(&mut self, id: RoomId, display_name: impl Into<String>, room_type: RoomType, settings: RoomSettings) {
        self.rooms.entry(id).or_insert_with(|| ChatRoom::new(id, display_name.into(), room_type, settings));
    }

    pub fn delete_room(&mut self, room_id: RoomId) {
        self.rooms.remove(&room_id);
        self.limiters.retain(|(r, _), _| *r != room_id);
    }

    fn room_mut(&mut self, room_id: RoomId) -> Result<&mut ChatRoom, ChatError> {
        self.rooms.get_mut(&room_id).ok_or(ChatError::NotFound(room_id))
    }

    fn room(&self, room_id: RoomId) -> Result<&ChatRoom, ChatError> {
        self.rooms.get(&room_id).ok_or(ChatError::NotFound(room_id))
    }

    pub fn join(&mut self, room_id: RoomId, agent_id: AgentId, display_name: String, role: ParticipantRole, now: SystemTime) -> Result<ChatEvent, ChatError> {
        let room = self.room_mut(room_id)?;
        room.add_participant(agent_id, Participant::new(role, display_name, now))?;
        Ok(ChatEvent::Join { room_id, agent_id, role })
    }

    pub fn leave(&mut self, room_id: RoomId, agent_id: AgentId) -> Result<ChatEvent, ChatError> {
        let room = self.room_mut(room_id)?;
        room.remove_participant(agent_id)?;
        self.limiters.remove(&(room_id, agent_id));
        Ok(ChatEvent::Leave { room_id, agent_id })
    }

    fn check_can_speak(&mut self, room_id: RoomId, sender_id: AgentId, now: (SystemTime, Instant)) -> Result<(), ChatError> {
        let room = self.room(room_id)?;
        let participant = room.participant(sender_id)?;
        if participant.is_muted(now.0) {
            let remaining = participant.mute_expiry.unwrap().duration_since(now.0).unwrap_or_default();
            return Err(ChatError::Muted { remaining });
        }
        let rate_config = self.rate_config;
        self.limiters.entry((room_id, sender_id)).or_insert_with(|| ChatRateLimiter::new(rate_config)).check(now.1)
    }

    fn record_sent(&mut self, room_id: RoomId, sender_id: AgentId) {
        if let Ok(room) = self.room_mut(room_id) {
            if let Some(participant) = room.participants.get_mut(&sender_id) {
                participant.message_count += 1;
            }
        }
    }

    pub fn send_text(
        &mut self,
        room_id: RoomId,
        sender_id: AgentId,
        sender_display_name: String,
        content: &str,
        reply_to: Option<MessageId>,
        now: (SystemTime, Instant),
    ) -> Result<ChatEvent, ChatError> {
        self.check_can_speak(room_id, sender_id, now)?;
        let content = validate_content(content)?;
        let message = ChatMessage {
            id: MessageId::new(),
            kind: MessageKind::Text,
            sender_id,
            sender_display_name,
            content,
            timestamp: now.0,
            room_id,
            reply_to,
            metadata: Value::Null,
        };
        self.room_mut(room_id)?.push_message(message.clone());
        self.record_sent(room_id, sender_id);
        Ok(ChatEvent::Message(message))
    }

    /// System messages bypass rate limiting and mute state; they aren't
    /// attributed to any participant.
    pub fn send_system(&mut self, room_id: RoomId, content: impl Into<String>, now: SystemTime) -> Result<ChatEvent, ChatError> {
        let message = ChatMessage {
            id: MessageId::new(),
            kind: MessageKind::System,
            sender_id: AgentId::nil(),
            sender_display_name: "system".to_string(),
            content: content.into(),
            timestamp: now,
            room_id,
            reply_to: None,
            metadata: Value::Null,
        };
        self.room_mut(room_id)?.push_message(message.clone());
        Ok(ChatEvent::Message(message))
    }

    /// Whispers are delivered only to `target_id` — never appended to
    /// room history, never fanned out as a [`ChatEvent`].
    pub fn send_whisper(
        &mut self,
        room_id: RoomId,
        sender_id: AgentId,
        sender_display_name: String,
        target_id: AgentId,
        content: &str,
        now: (SystemTime, Instant),
    ) -> Result<ChatMessage, ChatError> {
        if !self.room(room_id)?.settings.whispers_allowed {
            return Err(ChatError::WhispersDisallowed);
        }
        self.check_can_speak(room_id, sender_id, now)?;
        self.room(room_id)?.participant(target_id)?;
        let content = validate_content(content)?;
        let message = ChatMessage {
            id: MessageId::new(),
            kind: MessageKind::Whisper,
            sender_id,
            sender_display_name,
            content,
            timestamp: now.0,
            room_id,
            reply_to: None,
            metadata: Value::Null,
        };
        self.record_sent(room_id, sender_id);
        Ok(message)
    }

    pub fn add_reaction(&mut self, room_id: RoomId, message_id: MessageId, user: AgentId, emoji: String) -> Result<ChatEvent, ChatError> {
        let room = self.room_mut(room_id)?;
        if !room.settings.reactions_allowed {
            return Err(ChatError::ReactionsDisallowed);
        }
        room.participant(user)?;
        room.add_reaction(message_id, user, emoji.clone())?;
        Ok(ChatEvent::ReactionAdd { room_id, message_id, reaction: crate::types::Reaction { user, emoji } })
    }

    pub fn remove_reaction(&mut self, room_id: RoomId, message_id: MessageId, user: AgentId, emoji: String) -> Result<ChatEvent, ChatError> {
        let room = self.room_mut(room_id)?;
        room.remove_reaction(message_id, user, &emoji)?;
        Ok(ChatEvent::ReactionRemove { room_id, message_id, user, emoji })
    }

    fn caller_role(&self, room_id: RoomId, caller_id: AgentId) -> Result<ParticipantRole, ChatError> {
        Ok(self.room(room_id)?.participant(caller_id)?.role)
    }

    pub fn mute(&mut self, room_id: RoomId, caller_id: AgentId, target_id: AgentId, until: SystemTime, now: SystemTime) -> Result<ChatEvent, ChatError> {
        let caller_role = self.caller_role(room_id, caller_id)?;
        let duration = until.duration_since(now).unwrap_or_default();
        self.room_mut(room_id)?.mute(target_id, until, caller_role)?;
        Ok(ChatEvent::Muted { room_id, agent_id: target_id, duration })
    }

    pub fn unmute(&mut self, room_id: RoomId, caller_id: AgentId, target_id: AgentId) -> Result<ChatEvent, ChatError> {
        let caller_role = self.caller_role(room_id, caller_id)?;
        self.room_mut(room_id)?.unmute(target_id, caller_role)?;
        Ok(ChatEvent::Unmuted { room_id, agent_id: target_id })
    }

    pub fn kick(&mut self, room_id: RoomId, caller_id: AgentId, target_id: AgentId) -> Result<ChatEvent, ChatError> {
        let caller_role = self.caller_role(room_id, caller_id)?;
        self.room_mut(room_id)?.kick(target_id, caller_role)?;
        self.limiters.remove(&(room_id, target_id));
        Ok(ChatEvent::Kicked { room_id, agent_id: target_id, by: caller_id })
    }

    pub fn delete_message(&mut self, room_id: RoomId, caller_id: AgentId, message_id: MessageId) -> Result<ChatEvent, ChatError> {
        let caller_role = self.caller_role(room_id, caller_id)?;
        if !caller_role.is_moderator_or_above() {
            return Err(ChatError::PermissionDenied);
        }
        self.room_mut(room_id)?.delete_message(message_id)?;
        Ok(ChatEvent::MessageDeleted { room_id, message_id, by: caller_id })
    }

    pub fn typing(&self, room_id: RoomId, agent_id: AgentId) -> Result<ChatEvent, ChatError> {
        self.room(room_id)?.participant(agent_id)?;
        Ok(ChatEvent::Typing { room_id, agent_id })
    }

    pub fn history(&self, room_id: RoomId) -> Result<&std::collections::VecDeque<ChatMessage>, ChatError> {
        Ok(self.room(room_id)?.history())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for ChatManager {
    fn default() -> Self {
        Self::new()
    }
}
