//! What gets pushed down a spectator's channel.

use liku_patch::PatchOp;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum BroadcastFrame {
    /// The full rendered state, sent on first attach or on fallback.
    Snapshot(Value),
    /// An RFC 6902 patch from the spectator's previously cached snapshot.
    Patch(Vec<PatchOp>),
    /// A latency probe; the hub is expected to round-trip this over the
    /// wire and report the measured RTT back via
    /// [`crate::SpectatorHandle::record_latency`].
    Ping { nonce: u64 },
}

pub type SpectatorSender = tokio::sync::mpsc::UnboundedSender<BroadcastFrame>;
