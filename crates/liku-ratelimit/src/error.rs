use std::time::Duration;

/// Outcome of a rejected [`crate::Limiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// The connection is over its steady-state window limit. Carries the
    /// remaining time until a slot frees up.
    #[error("rate limit window exceeded")]
    WindowExceeded,
    /// The connection tripped the burst detector and is in cooldown.
    #[error("burst cooldown in effect")]
    BurstCooldown,
    /// The connection is currently banned. Carries the remaining ban
    /// duration so the caller can report it to the client.
    #[error("banned for {0:?}")]
    Banned(Duration),
}
