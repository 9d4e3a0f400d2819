//! Quality tiers that gate how often one spectator receives an update.

use std::time::Duration;

/// Fixed latency thresholds used to re-evaluate a spectator's tier.
/// Below `HIGH_MAX` stays high, below `MEDIUM_MAX` drops to medium,
/// anything slower drops to low.
const HIGH_MAX: Duration = Duration::from_millis(80);
const MEDIUM_MAX: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityTier {
    High,
    Medium,
    Low,
}

impl QualityTier {
    /// Minimum time between sends for this tier, per spec.md §4.7.
    pub fn interval(self) -> Duration {
        match self {
            Self::High => Duration::from_millis(50),
            Self::Medium => Duration::from_millis(100),
            Self::Low => Duration::from_millis(200),
        }
    }

    /// Chooses a tier from a smoothed round-trip latency.
    pub fn from_latency(latency: Duration) -> Self {
        if latency <= HIGH_MAX {
            Self::High
        } else if latency <= MEDIUM_MAX {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl Default for QualityTier {
    fn default() -> Self {
        Self::High
    }
}

/// Exponentially-smoothed latency tracker feeding [`QualityTier::from_latency`].
#[derive(Debug, Clone, Copy)]
pub struct LatencyTracker {
    smoothed: Option<Duration>,
    alpha: f64,
}

impl LatencyTracker {
    pub fn new(alpha: f64) -> Self {
        Self { smoothed: None, alpha }
    }

    pub fn record(&mut self, sample: Duration) -> Duration {
        let updated = match self.smoothed {
            None => sample,
            Some(prev) => {
                let prev_s = prev.as_secs_f64();
                let sample_s = sample.as_secs_f64();
                Duration::from_secs_f64(prev_s * (1.0 - self.alpha) + sample_s * self.alpha)
            }
        };
        self.smoothed = Some(updated);
        updated
    }

    pub fn current(&self) -> Option<Duration> {
        self.smoothed
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_tier_defaults_to_high() {
        assert_eq!(QualityTier::default(), QualityTier::High);
    }

    #[test]
    fn test_interval_matches_spec_values() {
        assert_eq!(QualityTier::High.interval(), Duration::from_millis(50));
        assert_eq!(QualityTier::Medium.interval(), Duration::from_millis(100));
        assert_eq!(QualityTier::Low.interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_from_latency_picks_the_right_bucket() {
        assert_eq!(QualityTier::from_latency(Duration::from_millis(10)), QualityTier::High);
        assert_eq!(QualityTier::from_latency(Duration::from_millis(120)), QualityTier::Medium);
        assert_eq!(QualityTier::from_latency(Duration::from_millis(500)), QualityTier::Low);
    }

    #[test]
    fn test_latency_tracker_first_sample_is_returned_unsmoothed() {
        let mut tracker = LatencyTracker::default();
        let first = tracker.record(Duration::from_millis(100));
        assert_eq!(first, Duration::from_millis(100));
    }

    #[test]
    fn test_latency_tracker_smooths_subsequent_samples() {
        let mut tracker = LatencyTracker::new(0.5);
        tracker.record(Duration::from_millis(100));
        let second = tracker.record(Duration::from_millis(200));
        assert_eq!(second, Duration::from_millis(150));
    }
}
