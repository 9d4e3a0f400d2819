//! Error types for the session layer, mappable onto the wire's closed
//! `ErrorKind` vocabulary.

use liku_game::{GameError, Slot};
use liku_protocol::ErrorKind;
use liku_registry::AgentId;

use crate::types::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session {0} is unavailable")]
    Unavailable(SessionId),

    #[error("session already started")]
    AlreadyStarted,

    #[error("session is not finished")]
    NotFinished,

    #[error("session is not in progress")]
    NotInProgress,

    #[error("spectators are not allowed in this session")]
    SpectatorsDisallowed,

    #[error("no free slot is available")]
    NoFreeSlot,

    #[error("agent {0} is not a player in this session")]
    NotAPlayer(AgentId),

    #[error("it is not slot {0}'s turn")]
    NotYourTurn(Slot),

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("agent {0} is already a participant in this session")]
    AlreadyInSession(AgentId),

    #[error("agent {0} is not a participant in this session")]
    NotInSession(AgentId),

    #[error("unknown game type: {0}")]
    UnknownGameType(String),
}

impl SessionError {
    /// Maps this error onto the closed, wire-visible error vocabulary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) | Self::UnknownGameType(_) => ErrorKind::NotFound,
            Self::AlreadyStarted => ErrorKind::AlreadyStarted,
            Self::NotFinished | Self::NotInProgress => ErrorKind::NotInProgress,
            Self::SpectatorsDisallowed => ErrorKind::SpectatorsDisallowed,
            Self::NoFreeSlot => ErrorKind::NoFreeSlot,
            Self::NotAPlayer(_) => ErrorKind::NotAPlayer,
            Self::NotYourTurn(_) => ErrorKind::NotYourTurn,
            Self::IllegalMove(_) => ErrorKind::IllegalMove,
            Self::AlreadyInSession(_) | Self::NotInSession(_) => ErrorKind::InvalidMessage,
        }
    }
}

impl From<GameError> for SessionError {
    fn from(err: GameError) -> Self {
        Self::IllegalMove(err.to_string())
    }
}
