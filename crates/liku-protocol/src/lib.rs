//! Wire envelope and error vocabulary for the Liku game hub.
//!
//! This crate defines the "language" every connected client and server
//! speak: the envelope shapes ([`InboundEnvelope`], [`OutboundEnvelope`]),
//! the codec that turns them into bytes, and the closed set of
//! [`ErrorKind`] values clients can rely on.
//!
//! It intentionally knows nothing about agents, sessions, or games —
//! those layers build on top of the opaque `payload`/`data` value this
//! crate carries.

mod codec;
mod error;
mod types;

pub use codec::{decode_inbound, encode_outbound, MAX_INBOUND_BYTES};
pub use error::ProtocolError;
pub use types::{
    AgentRole, AgentType, ErrorKind, InboundEnvelope, InboundKind, OutboundEnvelope, OutboundKind,
};
