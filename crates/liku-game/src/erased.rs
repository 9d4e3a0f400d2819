//! Object-safe wrapper around [`GameProtocol`].
//!
//! The session manager holds one session per game-type tag and cannot be
//! generic over every game's associated types at once — it needs a single
//! `Box<dyn ErasedGameProtocol>` per session. [`Erased<G>`] bridges a
//! concrete [`GameProtocol`] implementation to that object-safe contract by
//! round-tripping state and actions through [`serde_json::Value`], which is
//! also the shape the session already stores and the spectator differ
//! already diffs — no extra conversion cost at the boundary that matters.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::protocol::{ActionResult, GameError, GameProtocol, Slot};

/// Type-erased per-game contract the session manager depends on directly.
pub trait ErasedGameProtocol: Send + Sync {
    fn slots(&self) -> Vec<Slot>;
    fn initial_state(&self) -> Value;
    fn is_legal(&self, state: &Value, slot: &Slot, action: &Value) -> bool;
    fn apply_action(&self, state: &Value, slot: &Slot, action: &Value) -> Result<(Value, ActionResult), GameError>;
    fn next_to_move(&self, state: &Value) -> Option<Slot>;
    fn render(&self, state: &Value) -> Value;
}

/// Adapts a strongly-typed [`GameProtocol`] implementation, fixed to one
/// configuration, into an [`ErasedGameProtocol`].
pub struct Erased<G: GameProtocol> {
    config: G::Config,
    _marker: PhantomData<fn() -> G>,
}

impl<G: GameProtocol> Erased<G> {
    pub fn new(config: G::Config) -> Self {
        Self { config, _marker: PhantomData }
    }
}

impl<G> ErasedGameProtocol for Erased<G>
where
    G: GameProtocol,
    G::State: Serialize + DeserializeOwned,
    G::Action: Serialize + DeserializeOwned,
{
    fn slots(&self) -> Vec<Slot> {
        G::slots(&self.config)
    }

    fn initial_state(&self) -> Value {
        serde_json::to_value(G::initial_state(&self.config)).expect("game state must serialize to JSON")
    }

    fn is_legal(&self, state: &Value, slot: &Slot, action: &Value) -> bool {
        let Ok(state) = serde_json::from_value::<G::State>(state.clone()) else {
            return false;
        };
        let Ok(action) = serde_json::from_value::<G::Action>(action.clone()) else {
            return false;
        };
        G::is_legal(&state, slot, &action)
    }

    fn apply_action(&self, state: &Value, slot: &Slot, action: &Value) -> Result<(Value, ActionResult), GameError> {
        let state: G::State = serde_json::from_value(state.clone()).map_err(|_| GameError::MalformedAction)?;
        let action: G::Action = serde_json::from_value(action.clone()).map_err(|_| GameError::MalformedAction)?;
        let (next, result) = G::apply_action(&state, slot, &action)?;
        let next = serde_json::to_value(next).expect("game state must serialize to JSON");
        Ok((next, result))
    }

    fn next_to_move(&self, state: &Value) -> Option<Slot> {
        let state: G::State = serde_json::from_value(state.clone()).ok()?;
        G::next_to_move(&state)
    }

    fn render(&self, state: &Value) -> Value {
        match serde_json::from_value::<G::State>(state.clone()) {
            Ok(state) => G::render(&state),
            Err(_) => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tic_tac_toe::{Config, Move, TicTacToe};

    fn erased() -> Erased<TicTacToe> {
        Erased::new(Config)
    }

    #[test]
    fn test_erased_slots_matches_game() {
        assert_eq!(erased().slots(), vec!["X".to_string(), "O".to_string()]);
    }

    #[test]
    fn test_erased_round_trips_state_through_apply() {
        let game = erased();
        let state = game.initial_state();
        let action = serde_json::to_value(Move { row: 1, col: 1 }).unwrap();
        let (next, result) = game.apply_action(&state, &"X".to_string(), &action).unwrap();
        assert!(result.outcome.is_none());
        assert_eq!(next["board"][1][1], "X");
        assert_eq!(game.next_to_move(&next).as_deref(), Some("O"));
    }

    #[test]
    fn test_erased_malformed_action_errors() {
        let game = erased();
        let state = game.initial_state();
        let bad_action = serde_json::json!({ "not": "a move" });
        let err = game.apply_action(&state, &"X".to_string(), &bad_action).unwrap_err();
        assert_eq!(err, GameError::MalformedAction);
    }

    #[test]
    fn test_erased_is_legal_rejects_malformed_action() {
        let game = erased();
        let state = game.initial_state();
        assert!(!game.is_legal(&state, &"X".to_string(), &serde_json::json!(null)));
    }
}
