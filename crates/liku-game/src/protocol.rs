//! The per-game contract the session manager delegates to.
//!
//! A game is a pure state machine: no I/O, no knowledge of agents,
//! connections, or the wire envelope. The session manager owns everything
//! else (turn order, timers, persistence of who occupies which slot).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A game-specific seat, e.g. `"X"` or `"O"` for tic-tac-toe.
pub type Slot = String;

/// Errors a game's [`GameProtocol::apply_action`] can raise. These never
/// reach the wire directly — the session manager maps them onto the closed
/// `ErrorKind` vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("action out of range")]
    OutOfRange,
    #[error("cell already occupied")]
    Occupied,
    #[error("game already finished")]
    AlreadyFinished,
    #[error("action payload did not match the game's expected shape")]
    MalformedAction,
}

/// How a game ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    Win { slot: Slot, winning_line: Option<Vec<(usize, usize)>> },
    Draw,
}

/// The result of one successfully applied action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    pub outcome: Option<Outcome>,
}

/// The contract a turn-based game implements. The session manager is
/// entirely generic over this trait — tic-tac-toe and any future game are
/// different implementations of the same four operations.
pub trait GameProtocol {
    /// Per-session configuration (board size, variant rules, ...).
    type Config: Clone + Send + Sync;
    /// The authoritative game-state blob.
    type State: Clone + Send + Sync;
    /// One player action (a move).
    type Action: Clone + Send + Sync;

    /// The slots this game defines, in assignment order.
    fn slots(config: &Self::Config) -> Vec<Slot>;

    /// The state a freshly created session starts from.
    fn initial_state(config: &Self::Config) -> Self::State;

    /// Whether `action` is legal for `slot` against `state`. Turn order is
    /// the session manager's concern, not the game's — this only checks
    /// the move's own shape and target-cell legality.
    fn is_legal(state: &Self::State, slot: &Slot, action: &Self::Action) -> bool;

    /// Applies `action` for `slot`, returning the new state and whether
    /// the game ended. Callers must have already confirmed
    /// [`Self::is_legal`].
    fn apply_action(state: &Self::State, slot: &Slot, action: &Self::Action) -> Result<(Self::State, ActionResult), GameError>;

    /// The slot to move after `state`'s last action, or `None` once the
    /// game is terminal.
    fn next_to_move(state: &Self::State) -> Option<Slot>;

    /// Renders `state` as the JSON shape sent to clients and diffed by the
    /// spectator broadcaster.
    fn render(state: &Self::State) -> Value;
}
