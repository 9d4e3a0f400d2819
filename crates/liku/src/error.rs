//! Unified error type for the connection hub.
//!
//! Generalizes `arcforge/src/error.rs`'s `ArcforgeError` aggregation: one
//! `thiserror` enum wrapping every sub-crate's error type via `#[from]`, so
//! `?` works across crate boundaries inside the hub. [`HubError::kind`] is
//! new — it maps down onto the closed wire-level [`ErrorKind`] vocabulary,
//! since `arcforge` has no client-facing error taxonomy of its own.

use std::time::Duration;

use liku_chat::ChatError;
use liku_matchmaker::MatchError;
use liku_protocol::{ErrorKind, ProtocolError};
use liku_registry::RegistryError;
use liku_session::SessionError;
use liku_spectator::SpectatorError;
use liku_transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("authentication failed: {0}")]
    Auth(#[from] liku_auth::AuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Spectator(#[from] SpectatorError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid action: {0}, valid actions: {1}")]
    InvalidAction(String, String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("query timed out")]
    QueryTimeout,

    #[error("server at capacity")]
    ServerAtCapacity,

    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Maps this error onto the closed, wire-visible error vocabulary
    /// (spec.md §7). Every variant here has exactly one matching
    /// `ErrorKind` — none of the 27 kinds are unreachable, and none of the
    /// hub's error variants map to more than one.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Protocol(ProtocolError::Decode(_)) => ErrorKind::InvalidMessage,
            Self::Protocol(ProtocolError::Oversize(_)) => ErrorKind::InvalidMessage,
            Self::Protocol(ProtocolError::Encode(_)) => ErrorKind::Internal,
            Self::Auth(_) => ErrorKind::AuthFailed,
            Self::Session(err) => session_error_kind(err),
            Self::Registry(_) => ErrorKind::NotFound,
            Self::Match(err) => match_error_kind(err),
            Self::Spectator(err) => spectator_error_kind(err),
            Self::Chat(err) => chat_error_kind(err),
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::InvalidJson(_) => ErrorKind::InvalidJson,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::UnknownCommand(_) => ErrorKind::UnknownCommand,
            Self::InvalidAction(_, _) => ErrorKind::InvalidAction,
            Self::InvalidKey(_) => ErrorKind::InvalidKey,
            Self::QueryTimeout => ErrorKind::QueryTimeout,
            Self::ServerAtCapacity => ErrorKind::ServerAtCapacity,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

fn session_error_kind(err: &SessionError) -> ErrorKind {
    err.kind()
}

fn match_error_kind(err: &MatchError) -> ErrorKind {
    match err {
        MatchError::NotFound => ErrorKind::NotFound,
        MatchError::Expired => ErrorKind::Expired,
        MatchError::AlreadyMatched => ErrorKind::NotFound,
        MatchError::SelfJoin => ErrorKind::SelfJoin,
        MatchError::NotHost => ErrorKind::PermissionDenied,
        MatchError::Session(err) => session_error_kind(err),
    }
}

fn spectator_error_kind(err: &SpectatorError) -> ErrorKind {
    match err {
        SpectatorError::Unavailable(_) => ErrorKind::NotFound,
        SpectatorError::CapacityExceeded => ErrorKind::NoFreeSlot,
    }
}

fn chat_error_kind(err: &ChatError) -> ErrorKind {
    match err {
        ChatError::NotFound(_) => ErrorKind::NotFound,
        ChatError::NotInRoom(_) => ErrorKind::NotInRoom,
        ChatError::AlreadyInRoom(_) => ErrorKind::InvalidMessage,
        ChatError::Muted { .. } => ErrorKind::Muted,
        ChatError::EmptyMessage => ErrorKind::EmptyMessage,
        ChatError::MessageTooLong { .. } => ErrorKind::MessageTooLong,
        ChatError::WhispersDisallowed | ChatError::ReactionsDisallowed => ErrorKind::PermissionDenied,
        ChatError::RoomFull => ErrorKind::NoFreeSlot,
        ChatError::PermissionDenied => ErrorKind::PermissionDenied,
        ChatError::MessageNotFound(_) => ErrorKind::NotFound,
        ChatError::RateLimited { .. } => ErrorKind::RateLimited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_maps_to_rate_limited_kind() {
        let err = HubError::RateLimited { retry_after: Duration::from_secs(1) };
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn test_session_error_delegates_to_its_own_kind() {
        let err = HubError::Session(SessionError::NoFreeSlot);
        assert_eq!(err.kind(), ErrorKind::NoFreeSlot);
    }

    #[test]
    fn test_chat_rate_limited_maps_to_rate_limited_kind() {
        let err = HubError::Chat(ChatError::RateLimited { reason: liku_chat::RateLimitReason::Burst, retry_after: Duration::from_secs(1) });
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn test_match_self_join_maps_to_self_join_kind() {
        let err = HubError::Match(MatchError::SelfJoin);
        assert_eq!(err.kind(), ErrorKind::SelfJoin);
    }
}
