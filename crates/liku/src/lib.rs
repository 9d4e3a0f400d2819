//! # Liku
//!
//! A real-time coordination server for turn-based multi-agent games. One
//! [`hub::Hub`] accepts WebSocket connections, authenticates them, and
//! routes their closed action vocabulary (spec.md §4.9) into matchmaking,
//! a running game session, its chat room, or its spectator feed.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use liku::prelude::*;
//!
//! # async fn run() -> Result<(), HubError> {
//! let hub = dev_hub(HubConfig::default()).await?;
//! hub.run().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod router;
pub mod subscriptions;

pub mod prelude {
    pub use crate::config::{AuthConfig, GameProfile, HubConfig, TlsConfig, TlsVersion};
    pub use crate::error::HubError;
    pub use crate::hub::{dev_hub, jwt_hub, Hub, HubBuilder};
}
