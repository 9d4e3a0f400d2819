//! Per-game-type broadcaster tunables.

use std::time::Duration;

use liku_patch::{DiffOptions, FallbackThresholds};

#[derive(Debug, Clone)]
pub struct SpectatorConfig {
    /// How often the session-level broadcast timer fires. Only runs while
    /// at least one spectator is attached.
    pub broadcast_interval: Duration,
    /// Upper bound on concurrently attached spectators for one session.
    pub max_spectators: usize,
    /// Whether RFC 6902 patches are attempted before falling back to a
    /// full snapshot.
    pub patch_enabled: bool,
    pub diff_options: DiffOptions,
    pub fallback: FallbackThresholds,
    /// Ticks between latency pings to each attached spectator.
    pub ping_interval_ticks: u32,
    /// Drop a spectator after this many consecutive send failures.
    pub max_consecutive_failures: u32,
}

impl SpectatorConfig {
    /// Tic-tac-toe's cadence per spec.md §4.7's worked example.
    pub fn tic_tac_toe() -> Self {
        Self { broadcast_interval: Duration::from_millis(100), ..Self::default() }
    }

    /// A fast-paced action-game cadence per spec.md §4.7's worked example.
    pub fn action_game() -> Self {
        Self { broadcast_interval: Duration::from_millis(33), ..Self::default() }
    }
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: Duration::from_millis(100),
            max_spectators: 50,
            patch_enabled: true,
            diff_options: DiffOptions::default(),
            fallback: FallbackThresholds::default(),
            ping_interval_ticks: 50,
            max_consecutive_failures: 3,
        }
    }
}
