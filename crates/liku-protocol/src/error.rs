//! Error types for the protocol layer.

/// Errors that can occur while decoding or encoding envelope frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame exceeded [`crate::MAX_INBOUND_BYTES`]. Carries the observed
    /// size so the caller can log it before closing the connection.
    #[error("frame too large: {0} bytes")]
    Oversize(usize),

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed — malformed JSON or the wrong shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
