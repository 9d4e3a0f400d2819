//! Round-robin turn order and the per-turn deadline.
//!
//! This is deliberately dumb: it tracks which slots are still in the game
//! and when the current turn expires. Whose turn it actually is comes from
//! the game's own state (`ErasedGameProtocol::next_to_move`) — the two stay
//! in sync because [`crate::session::Session`] drives both from the same
//! move.

use std::time::{Duration, Instant};

use liku_game::Slot;

pub struct TurnManager {
    order: Vec<Slot>,
    deadline: Option<Instant>,
}

impl TurnManager {
    pub fn new(order: Vec<Slot>) -> Self {
        Self { order, deadline: None }
    }

    /// Arms a deadline `budget` from `now`. Call whenever a new turn starts.
    pub fn start_timer(&mut self, budget: Duration, now: Instant) {
        self.deadline = Some(now + budget);
    }

    pub fn cancel_timer(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drops a slot from turn-order bookkeeping, e.g. on forfeit-leave.
    pub fn remove_slot(&mut self, slot: &Slot) {
        self.order.retain(|s| s != slot);
    }

    pub fn slots(&self) -> &[Slot] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_turn_manager_has_no_deadline() {
        let turn = TurnManager::new(vec!["X".into(), "O".into()]);
        assert_eq!(turn.deadline(), None);
    }

    #[test]
    fn test_start_timer_arms_a_future_deadline() {
        let mut turn = TurnManager::new(vec!["X".into(), "O".into()]);
        let now = Instant::now();
        turn.start_timer(Duration::from_secs(30), now);
        assert!(turn.deadline().unwrap() > now);
    }

    #[test]
    fn test_cancel_timer_clears_deadline() {
        let mut turn = TurnManager::new(vec!["X".into()]);
        turn.start_timer(Duration::from_secs(1), Instant::now());
        turn.cancel_timer();
        assert_eq!(turn.deadline(), None);
    }

    #[test]
    fn test_remove_slot_drops_it_from_order() {
        let mut turn = TurnManager::new(vec!["X".into(), "O".into()]);
        turn.remove_slot(&"O".to_string());
        assert_eq!(turn.slots(), ["X".to_string()]);
    }
}
