//! Per-session tunables and the status state machine.

use std::time::Duration;

use liku_game::Slot;
use serde::{Deserialize, Serialize};

/// What happens to the clock holder when their turn timer expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTimeoutPolicy {
    /// The timed-out player forfeits the session, per spec.md §9.
    Forfeit,
    /// Turn passes to the next slot without ending the session.
    SkipTurn,
}

impl Default for TurnTimeoutPolicy {
    fn default() -> Self {
        Self::Forfeit
    }
}

/// How the starting slot is chosen when a session begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPlayerPolicy {
    /// A fair coin flip among the game's slots.
    Random,
    /// Always the same slot (used by deterministic tests and fixed setups).
    Explicit(Slot),
}

impl Default for StartPlayerPolicy {
    fn default() -> Self {
        Self::Random
    }
}

/// How a join request's preferred slot is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAssignmentPolicy {
    /// Honor the requested slot if free, else assign the first free slot.
    PreferRequested,
    /// Ignore the preference entirely and assign at random among free slots.
    Random,
}

impl Default for SlotAssignmentPolicy {
    fn default() -> Self {
        Self::PreferRequested
    }
}

/// Slot-swap and starter-reroll behavior on rematch, per spec.md §9: both
/// default to true. When `reroll_starter` is false, the agent who started
/// the previous game starts again, wherever the swap left them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RematchPolicy {
    pub swap_slots: bool,
    pub reroll_starter: bool,
}

impl Default for RematchPolicy {
    fn default() -> Self {
        Self { swap_slots: true, reroll_starter: true }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub turn_time_budget: Duration,
    pub turn_timeout_policy: TurnTimeoutPolicy,
    pub spectator_allowed: bool,
    pub max_spectators: usize,
    pub start_player_policy: StartPlayerPolicy,
    pub slot_assignment_policy: SlotAssignmentPolicy,
    pub rematch_policy: RematchPolicy,
    pub autostart: bool,
    /// How long a finished session survives before the manager reaps it.
    pub finished_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_time_budget: Duration::from_secs(30),
            turn_timeout_policy: TurnTimeoutPolicy::default(),
            spectator_allowed: true,
            max_spectators: 50,
            start_player_policy: StartPlayerPolicy::default(),
            slot_assignment_policy: SlotAssignmentPolicy::default(),
            rematch_policy: RematchPolicy::default(),
            autostart: true,
            finished_ttl: Duration::from_secs(3600),
        }
    }
}

/// A session's lifecycle state. Unlike a strictly linear pipeline, `Finished`
/// can return to `Waiting` via a rematch, so there is no single total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Ready,
    Playing,
    Paused,
    Finished,
}

impl SessionStatus {
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting | Self::Ready)
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Ready => "ready",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
        };
        write!(f, "{s}")
    }
}
