//! Events fanned out to every participant of a room, per spec.md §4.8.

use std::time::Duration;

use liku_registry::AgentId;

use crate::message::{ChatMessage, MessageId};
use crate::types::{ParticipantRole, Reaction, RoomId};

#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message(ChatMessage),
    ReactionAdd { room_id: RoomId, message_id: MessageId, reaction: Reaction },
    ReactionRemove { room_id: RoomId, message_id: MessageId, user: AgentId, emoji: String },
    Join { room_id: RoomId, agent_id: AgentId, role: ParticipantRole },
    Leave { room_id: RoomId, agent_id: AgentId },
    Muted { room_id: RoomId, agent_id: AgentId, duration: Duration },
    Unmuted { room_id: RoomId, agent_id: AgentId },
    Kicked { room_id: RoomId, agent_id: AgentId, by: AgentId },
    MessageDeleted { room_id: RoomId, message_id: MessageId, by: AgentId },
    Typing { room_id: RoomId, agent_id: AgentId },
}
