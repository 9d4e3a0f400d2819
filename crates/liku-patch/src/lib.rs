//! RFC 6902 JSON-Patch diff, apply, and validate.
//!
//! The spectator broadcaster is the only consumer, but this crate knows
//! nothing about sessions or spectators — it transforms [`serde_json::Value`]
//! documents and nothing else.

mod apply;
mod diff;
mod error;
mod fallback;
mod op;
mod pointer;
mod validate;

pub use apply::apply;
pub use diff::{diff, diff_with, ArrayDiffStrategy, DiffOptions};
pub use error::PatchError;
pub use fallback::{should_send_full_snapshot, FallbackThresholds};
pub use op::PatchOp;
pub use pointer::{escape_segment, unescape_segment};
pub use validate::validate;
