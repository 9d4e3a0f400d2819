//! Per-spectator pacing, latency-based quality tiers, and RFC 6902
//! patch/snapshot broadcast for live game viewers, per spec.md §4.7.
//!
//! One [`SpectatorHandle`] is spawned per session and fed that session's
//! [`liku_session::SessionEvent`] stream; it never touches game rules
//! directly, only the rendered state it's handed.

mod broadcaster;
mod config;
mod error;
mod frame;
mod record;
mod tier;

pub use broadcaster::{spawn_broadcaster, SpectatorHandle};
pub use config::SpectatorConfig;
pub use error::SpectatorError;
pub use frame::{BroadcastFrame, SpectatorSender};
pub use tier::QualityTier;
