//! Maps a wire-visible game-type name to a factory for its erased protocol.

use std::collections::HashMap;
use std::sync::Arc;

use crate::erased::ErasedGameProtocol;

type Factory = Arc<dyn Fn() -> Box<dyn ErasedGameProtocol> + Send + Sync>;

/// Lets the session manager create a fresh `Box<dyn ErasedGameProtocol>`
/// for any registered game type without being generic over it.
#[derive(Default, Clone)]
pub struct GameRegistry {
    factories: HashMap<String, Factory>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, game_type: impl Into<String>, factory: impl Fn() -> Box<dyn ErasedGameProtocol> + Send + Sync + 'static) {
        self.factories.insert(game_type.into(), Arc::new(factory));
    }

    pub fn create(&self, game_type: &str) -> Option<Box<dyn ErasedGameProtocol>> {
        self.factories.get(game_type).map(|factory| factory())
    }

    pub fn contains(&self, game_type: &str) -> bool {
        self.factories.contains_key(game_type)
    }

    pub fn game_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tic_tac_toe::{Config, TicTacToe};
    use crate::Erased;

    #[test]
    fn test_registered_game_type_can_be_created() {
        let mut registry = GameRegistry::new();
        registry.register("tic_tac_toe", || Box::new(Erased::<TicTacToe>::new(Config)));
        let game = registry.create("tic_tac_toe").unwrap();
        assert_eq!(game.slots(), vec!["X".to_string(), "O".to_string()]);
    }

    #[test]
    fn test_unknown_game_type_returns_none() {
        let registry = GameRegistry::new();
        assert!(registry.create("chess").is_none());
    }
}
