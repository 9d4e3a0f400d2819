//! Per-user chat rate limiting, built from two stacked
//! [`liku_ratelimit::Limiter`]s: one for the steady per-second rate, one
//! for the per-minute rate. Each limiter's own burst detector covers the
//! short-window-burst-then-cooldown rule.

use std::time::{Duration, Instant};

use liku_ratelimit::{Limiter, LimiterConfig, RateLimitError};

use crate::error::{ChatError, RateLimitReason};

#[derive(Debug, Clone, Copy)]
pub struct ChatRateConfig {
    pub per_second: u32,
    pub per_minute: u32,
    pub burst_limit: u32,
    pub burst_cooldown: Duration,
}

impl Default for ChatRateConfig {
    fn default() -> Self {
        Self { per_second: 2, per_minute: 30, burst_limit: 5, burst_cooldown: Duration::from_secs(1) }
    }
}

pub struct ChatRateLimiter {
    per_second: Limiter,
    per_minute: Limiter,
}

impl ChatRateLimiter {
    pub fn new(config: ChatRateConfig) -> Self {
        let per_second = Limiter::new(LimiterConfig {
            window: Duration::from_secs(1),
            window_limit: config.per_second,
            burst_limit: config.burst_limit,
            burst_window: Duration::from_secs(1),
            burst_cooldown: config.burst_cooldown,
            temp_ban: config.burst_cooldown,
            long_ban: config.burst_cooldown,
            escalation_threshold: u32::MAX,
            escalation_window: Duration::from_secs(1),
        });
        let per_minute = Limiter::new(LimiterConfig {
            window: Duration::from_secs(60),
            window_limit: config.per_minute,
            burst_limit: u32::MAX,
            burst_window: Duration::from_secs(60),
            burst_cooldown: Duration::ZERO,
            temp_ban: Duration::ZERO,
            long_ban: Duration::ZERO,
            escalation_threshold: u32::MAX,
            escalation_window: Duration::from_secs(60),
        });
        Self { per_second, per_minute }
    }

    pub fn check(&mut self, now: Instant) -> Result<(), ChatError> {
        if let Err(err) = self.per_second.check(now) {
            return Err(map_error(err, per_second_reason(&err)));
        }
        if let Err(err) = self.per_minute.check(now) {
            return Err(map_error(err, RateLimitReason::PerMinute));
        }
        Ok(())
    }
}

fn per_second_reason(err: &RateLimitError) -> RateLimitReason {
    match err {
        RateLimitError::Banned(_) => RateLimitReason::Burst,
        _ => RateLimitReason::PerSecond,
    }
}

fn map_error(err: RateLimitError, reason: RateLimitReason) -> ChatError {
    let retry_after = match err {
        RateLimitError::Banned(duration) => duration,
        RateLimitError::WindowExceeded => Duration::from_secs(1),
        RateLimitError::BurstCooldown => Duration::from_secs(1),
    };
    ChatError::RateLimited { reason, retry_after }
}

impl Default for ChatRateLimiter {
    fn default() -> Self {
        Self::new(ChatRateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_is_admitted() {
        let mut limiter = ChatRateLimiter::default();
        assert!(limiter.check(Instant::now()).is_ok());
    }

    #[test]
    fn test_burst_over_five_in_one_second_is_rate_limited() {
        let mut limiter = ChatRateLimiter::default();
        let now = Instant::now();
        for _ in 0..5 {
            let _ = limiter.check(now);
        }
        let result = limiter.check(now);
        assert!(matches!(result, Err(ChatError::RateLimited { reason: RateLimitReason::Burst, .. })));
    }
}
