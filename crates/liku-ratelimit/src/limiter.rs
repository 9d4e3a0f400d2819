//! Per-connection sliding-window limiter with burst detection and
//! escalating bans.
//!
//! One [`Limiter`] is owned per connection by the command router. Every
//! inbound frame except `ping` passes through [`Limiter::check`] before the
//! router looks at its contents.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::LimiterConfig;
use crate::error::RateLimitError;

pub struct Limiter {
    config: LimiterConfig,
    window: VecDeque<Instant>,
    burst: VecDeque<Instant>,
    ban_until: Option<Instant>,
    ban_history: VecDeque<Instant>,
}

impl Limiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            window: VecDeque::new(),
            burst: VecDeque::new(),
            ban_until: None,
            ban_history: VecDeque::new(),
        }
    }

    /// Records one inbound message at `now` and decides whether it is
    /// admitted. `ping` frames should call [`Self::check_exempt`] instead —
    /// they bypass the window/burst counters but still respect an active
    /// ban, so a banned connection can't use pings as a side channel.
    pub fn check(&mut self, now: Instant) -> Result<(), RateLimitError> {
        if let Some(remaining) = self.active_ban(now) {
            return Err(RateLimitError::Banned(remaining));
        }

        self.window.push_back(now);
        purge_before(&mut self.window, now, self.config.window);
        self.burst.push_back(now);
        purge_before(&mut self.burst, now, self.config.burst_window);

        if self.burst.len() as u32 > self.config.burst_limit {
            let duration = self.escalate(now);
            return Err(RateLimitError::Banned(duration));
        }

        if self.window.len() as u32 > self.config.window_limit {
            return Err(RateLimitError::WindowExceeded);
        }

        Ok(())
    }

    /// Checks an exempt (ping) frame: only an active ban blocks it.
    pub fn check_exempt(&mut self, now: Instant) -> Result<(), RateLimitError> {
        match self.active_ban(now) {
            Some(remaining) => Err(RateLimitError::Banned(remaining)),
            None => Ok(()),
        }
    }

    fn active_ban(&mut self, now: Instant) -> Option<Duration> {
        match self.ban_until {
            Some(until) if until > now => Some(until - now),
            Some(_) => {
                self.ban_until = None;
                None
            }
            None => None,
        }
    }

    /// Applies a ban in response to a burst violation, escalating to a long
    /// ban once [`LimiterConfig::escalation_threshold`] temporary bans have
    /// landed within [`LimiterConfig::escalation_window`].
    fn escalate(&mut self, now: Instant) -> Duration {
        purge_before(&mut self.ban_history, now, self.config.escalation_window);
        self.ban_history.push_back(now);

        let duration = if self.ban_history.len() as u32 >= self.config.escalation_threshold {
            self.config.long_ban
        } else {
            self.config.temp_ban
        };
        self.ban_until = Some(now + duration);
        duration
    }
}

fn purge_before(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LimiterConfig {
        LimiterConfig {
            window: Duration::from_secs(1),
            window_limit: 3,
            burst_limit: 2,
            burst_window: Duration::from_millis(30),
            burst_cooldown: Duration::from_millis(30),
            temp_ban: Duration::from_millis(100),
            long_ban: Duration::from_secs(1),
            escalation_threshold: 2,
            escalation_window: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_admits_messages_under_every_threshold() {
        let mut limiter = Limiter::new(config());
        let now = Instant::now();
        assert!(limiter.check(now).is_ok());
    }

    #[test]
    fn test_burst_violation_triggers_temp_ban() {
        let mut limiter = Limiter::new(config());
        let now = Instant::now();
        limiter.check(now).unwrap();
        limiter.check(now).unwrap();
        let result = limiter.check(now);
        assert!(matches!(result, Err(RateLimitError::Banned(_))));
    }

    #[test]
    fn test_second_burst_within_escalation_window_triggers_long_ban() {
        let mut limiter = Limiter::new(config());
        let t0 = Instant::now();
        limiter.check(t0).unwrap();
        limiter.check(t0).unwrap();
        let first_ban = limiter.check(t0).unwrap_err();
        let first_duration = match first_ban {
            RateLimitError::Banned(d) => d,
            _ => panic!("expected ban"),
        };
        assert_eq!(first_duration, Duration::from_millis(100));

        let t1 = t0 + Duration::from_secs(1);
        limiter.check(t1).unwrap();
        limiter.check(t1).unwrap();
        let second_ban = limiter.check(t1).unwrap_err();
        match second_ban {
            RateLimitError::Banned(d) => assert_eq!(d, Duration::from_secs(1)),
            _ => panic!("expected ban"),
        }
    }

    #[test]
    fn test_ban_blocks_further_checks_until_expiry() {
        let mut limiter = Limiter::new(config());
        let t0 = Instant::now();
        limiter.check(t0).unwrap();
        limiter.check(t0).unwrap();
        limiter.check(t0).unwrap_err();

        let still_banned = limiter.check(t0 + Duration::from_millis(50));
        assert!(matches!(still_banned, Err(RateLimitError::Banned(_))));

        let expired = limiter.check(t0 + Duration::from_millis(200));
        assert!(expired.is_ok());
    }

    #[test]
    fn test_window_limit_exceeded_without_burst() {
        let mut limiter = Limiter::new(config());
        let base = Instant::now();
        for i in 0..3 {
            limiter.check(base + Duration::from_millis(i * 40)).unwrap();
        }
        let result = limiter.check(base + Duration::from_millis(130));
        assert!(matches!(result, Err(RateLimitError::WindowExceeded)));
    }

    #[test]
    fn test_exempt_check_ignores_window_but_not_ban() {
        let mut limiter = Limiter::new(config());
        let t0 = Instant::now();
        limiter.check(t0).unwrap();
        limiter.check(t0).unwrap();
        limiter.check(t0).unwrap_err();
        assert!(matches!(limiter.check_exempt(t0), Err(RateLimitError::Banned(_))));
        assert!(limiter.check_exempt(t0 + Duration::from_millis(200)).is_ok());
    }
}
