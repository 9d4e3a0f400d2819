//! Identifiers, roles, and settings shared across a chat room.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use liku_registry::AgentId;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds the room id a game session's chat room should use, so the
    /// hub can derive one deterministically from a session id without
    /// this crate depending on `liku-session`.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomType {
    Game,
    Lobby,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParticipantRole {
    Viewer,
    Player,
    Moderator,
    Owner,
}

impl ParticipantRole {
    pub fn is_moderator_or_above(self) -> bool {
        self >= Self::Moderator
    }
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub role: ParticipantRole,
    pub display_name: String,
    pub joined_at: SystemTime,
    pub mute_expiry: Option<SystemTime>,
    pub message_count: u32,
}

impl Participant {
    pub fn new(role: ParticipantRole, display_name: String, now: SystemTime) -> Self {
        Self { role, display_name, joined_at: now, mute_expiry: None, message_count: 0 }
    }

    pub fn is_muted(&self, now: SystemTime) -> bool {
        matches!(self.mute_expiry, Some(expiry) if expiry > now)
    }
}

#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub max_participants: usize,
    pub slow_mode: std::time::Duration,
    pub reactions_allowed: bool,
    pub whispers_allowed: bool,
    pub retention_count: usize,
    pub emotes_allowed: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_participants: 100,
            slow_mode: std::time::Duration::ZERO,
            reactions_allowed: true,
            whispers_allowed: true,
            retention_count: 500,
            emotes_allowed: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reaction {
    pub user: AgentId,
    pub emoji: String,
}

pub type ReactionMap = HashMap<crate::message::MessageId, Vec<Reaction>>;
