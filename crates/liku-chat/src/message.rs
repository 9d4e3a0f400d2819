//! Chat message shape.

use std::time::SystemTime;

use liku_registry::AgentId;
use serde_json::Value;
use uuid::Uuid;

use crate::types::RoomId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reconstructs a [`MessageId`] from its wire form — the uuid a prior
    /// [`ChatMessage`] handed the client in a message event's `id` field.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Reaction,
    System,
    Emote,
    Whisper,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub sender_id: AgentId,
    pub sender_display_name: String,
    pub content: String,
    pub timestamp: SystemTime,
    pub room_id: RoomId,
    pub reply_to: Option<MessageId>,
    pub metadata: Value,
}

/// Content rules per spec.md §4.8: non-empty after trim, ≤500 code points.
pub const MAX_CONTENT_CODEPOINTS: usize = 500;

pub fn validate_content(content: &str) -> Result<String, crate::error::ChatError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(crate::error::ChatError::EmptyMessage);
    }
    if trimmed.chars().count() > MAX_CONTENT_CODEPOINTS {
        return Err(crate::error::ChatError::MessageTooLong { max: MAX_CONTENT_CODEPOINTS });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_rejects_whitespace_only() {
        assert!(matches!(validate_content("   \n  "), Err(crate::error::ChatError::EmptyMessage)));
    }

    #[test]
    fn test_validate_content_rejects_over_the_codepoint_cap() {
        let content = "x".repeat(MAX_CONTENT_CODEPOINTS + 1);
        assert!(matches!(validate_content(&content), Err(crate::error::ChatError::MessageTooLong { .. })));
    }

    #[test]
    fn test_validate_content_trims_and_accepts() {
        assert_eq!(validate_content("  hi  ").unwrap(), "hi");
    }
}
