use std::time::Duration;

/// Tunables for a [`crate::Limiter`]. Defaults match what the hub applies to
/// a freshly-registered connection before any per-agent override.
#[derive(Debug, Clone, Copy)]
pub struct LimiterConfig {
    /// Width of the sliding window used for the steady-state rate.
    pub window: Duration,
    /// Maximum messages admitted per `window`.
    pub window_limit: u32,
    /// Messages admitted within `burst_window` before a burst cooldown kicks in.
    pub burst_limit: u32,
    /// Width of the burst-detection window.
    pub burst_window: Duration,
    /// Cooldown applied once a burst is detected.
    pub burst_cooldown: Duration,
    /// Duration of a temporary ban after repeated violations.
    pub temp_ban: Duration,
    /// Duration of a long ban once the escalation threshold is crossed.
    pub long_ban: Duration,
    /// Number of temporary bans within `escalation_window` before a long ban.
    pub escalation_threshold: u32,
    /// Window over which temporary bans count toward escalation.
    pub escalation_window: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(1),
            window_limit: 30,
            burst_limit: 10,
            burst_window: Duration::from_millis(30),
            burst_cooldown: Duration::from_millis(30),
            temp_ban: Duration::from_secs(30),
            long_ban: Duration::from_secs(24 * 60 * 60),
            escalation_threshold: 3,
            escalation_window: Duration::from_secs(10 * 60),
        }
    }
}
