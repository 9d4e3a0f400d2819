//! Per-room text chat: join/leave, messages, reactions, moderation, and
//! rate limiting, per spec.md §4.8. Deliberately synchronous — unlike
//! [`liku_session`] or [`liku_spectator`], chat has no timer of its own,
//! so it's driven directly from the hub rather than run as an actor.

mod error;
mod event;
mod manager;
mod message;
mod ratelimit;
mod room;
mod types;

pub use error::{ChatError, RateLimitReason};
pub use event::ChatEvent;
pub use manager::ChatManager;
pub use message::{ChatMessage, MessageId, MessageKind, MAX_CONTENT_CODEPOINTS};
pub use ratelimit::{ChatRateConfig, ChatRateLimiter};
pub use types::{Participant, ParticipantRole, Reaction, RoomId, RoomSettings, RoomType};
