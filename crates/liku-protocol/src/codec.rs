//! Frame codec: bytes on the wire to [`InboundEnvelope`]/[`OutboundEnvelope`].
//!
//! The hub reads text frames off the transport and hands them here before
//! anything else touches them. Decoding failure means the frame never
//! reaches the rate limiter or router — it's simply not a message.

use crate::{InboundEnvelope, OutboundEnvelope, ProtocolError};

/// Maximum accepted inbound frame size, in bytes. Oversize frames are a
/// policy violation, not a decode error — the caller should close the
/// connection rather than retry.
pub const MAX_INBOUND_BYTES: usize = 1024 * 1024;

/// Decodes a raw inbound frame, rejecting anything over [`MAX_INBOUND_BYTES`]
/// before even attempting to parse it.
pub fn decode_inbound(data: &[u8]) -> Result<InboundEnvelope, ProtocolError> {
    if data.len() > MAX_INBOUND_BYTES {
        return Err(ProtocolError::Oversize(data.len()));
    }
    serde_json::from_slice(data).map_err(ProtocolError::Decode)
}

/// Serializes an outbound frame to bytes for the transport to send.
pub fn encode_outbound(envelope: &OutboundEnvelope) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(envelope).map_err(ProtocolError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, OutboundKind};

    #[test]
    fn test_decode_inbound_round_trips_valid_frame() {
        let json = br#"{"type":"ping"}"#;
        let env = decode_inbound(json).unwrap();
        assert_eq!(env.kind, crate::InboundKind::Ping);
    }

    #[test]
    fn test_decode_inbound_rejects_oversize() {
        let huge = vec![b'a'; MAX_INBOUND_BYTES + 1];
        let result = decode_inbound(&huge);
        assert!(matches!(result, Err(ProtocolError::Oversize(_))));
    }

    #[test]
    fn test_decode_inbound_rejects_malformed_json() {
        let result = decode_inbound(b"{not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_outbound_produces_valid_json() {
        let env = OutboundEnvelope::error(ErrorKind::Internal, "boom", 1);
        let bytes = encode_outbound(&env).unwrap();
        let decoded: OutboundEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded.kind, OutboundKind::Error);
    }
}
