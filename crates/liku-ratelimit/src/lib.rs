//! Sliding-window rate limiting with burst detection and ban escalation.
//!
//! One [`Limiter`] tracks a single connection's inbound traffic. It knows
//! nothing about envelopes or commands — the router calls [`Limiter::check`]
//! before it does anything else with a frame.

mod config;
mod error;
mod limiter;

pub use config::LimiterConfig;
pub use error::RateLimitError;
pub use limiter::Limiter;
