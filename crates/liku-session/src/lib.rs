//! Authoritative session lifecycle for the Liku game hub.
//!
//! Each session runs as an isolated Tokio task (actor model) holding one
//! game's state behind a [`liku_game::ErasedGameProtocol`] trait object, a
//! round-robin turn clock, and the player/spectator membership for that
//! game. The session manager routes agents to sessions but never touches
//! game state directly.

mod actor;
mod config;
mod error;
mod manager;
mod session;
mod turn;
mod types;

pub use actor::{ParticipantSender, SessionEvent, SessionHandle, SessionInfo};
pub use config::{RematchPolicy, SessionConfig, SessionStatus, SlotAssignmentPolicy, StartPlayerPolicy, TurnTimeoutPolicy};
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{JoinOutcome, LeaveOutcome, MoveOutcome, SeatRequest};
pub use types::{EndReason, MoveRecord, SessionId, SessionMode, SessionOutcome};
