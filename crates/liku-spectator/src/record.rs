//! Per-(session, viewer) projection state.

use std::time::Instant;

use serde_json::Value;

use crate::tier::{LatencyTracker, QualityTier};

pub struct SpectatorRecord {
    pub tier: QualityTier,
    pub tier_override: Option<QualityTier>,
    pub latency: LatencyTracker,
    pub last_sent_state: Option<Value>,
    pub last_sent_at: Option<Instant>,
    pub bytes_sent: u64,
    pub consecutive_failures: u32,
}

impl SpectatorRecord {
    pub fn new() -> Self {
        Self {
            tier: QualityTier::default(),
            tier_override: None,
            latency: LatencyTracker::default(),
            last_sent_state: None,
            last_sent_at: None,
            bytes_sent: 0,
            consecutive_failures: 0,
        }
    }

    pub fn effective_tier(&self) -> QualityTier {
        self.tier_override.unwrap_or(self.tier)
    }

    /// Whether this spectator's pacing quota has elapsed as of `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_sent_at {
            None => true,
            Some(last) => now.duration_since(last) >= self.effective_tier().interval(),
        }
    }
}

impl Default for SpectatorRecord {
    fn default() -> Self {
        Self::new()
    }
}
