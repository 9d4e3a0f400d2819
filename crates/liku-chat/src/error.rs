use std::time::Duration;

use liku_registry::AgentId;

use crate::types::RoomId;

/// Which of the three rate limits a `RATE_LIMITED` failure tripped, per
/// spec.md §4.8's "reason discriminator".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    PerSecond,
    PerMinute,
    Burst,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat room {0} not found")]
    NotFound(RoomId),
    #[error("agent {0} is not a participant in this room")]
    NotInRoom(AgentId),
    #[error("agent {0} is already a participant in this room")]
    AlreadyInRoom(AgentId),
    #[error("room is muted for {remaining:?}")]
    Muted { remaining: Duration },
    #[error("message content must not be empty")]
    EmptyMessage,
    #[error("message content exceeds {max} code points")]
    MessageTooLong { max: usize },
    #[error("whispers are disabled in this room")]
    WhispersDisallowed,
    #[error("reactions are disabled in this room")]
    ReactionsDisallowed,
    #[error("room is at capacity")]
    RoomFull,
    #[error("caller lacks permission for this action")]
    PermissionDenied,
    #[error("message {0:?} not found")]
    MessageNotFound(crate::message::MessageId),
    #[error("rate limited ({reason:?}), retry after {retry_after:?}")]
    RateLimited { reason: RateLimitReason, retry_after: Duration },
}
