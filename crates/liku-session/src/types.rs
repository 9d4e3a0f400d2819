//! Identifiers and small value types shared across this crate.

use std::fmt;

use liku_game::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable identity for one session, allocated at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is driving each side of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    HumanVsHuman,
    HumanVsAgent,
    AgentVsAgent,
}

/// One accepted move, kept for the session's move history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    pub slot: liku_game::Slot,
    pub action: Value,
    pub move_number: u32,
}

/// Why a session stopped accepting moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Normal,
    Forfeit,
}

/// A terminal game result together with why the session ended that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub outcome: Outcome,
    pub reason: EndReason,
}
