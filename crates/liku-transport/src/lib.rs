//! Transport abstraction for the Liku game hub.
//!
//! Provides the [`Transport`] and [`Connection`] traits used by the
//! connection hub to accept clients and move JSON text frames, plus the
//! [`HandshakeCredentials`] a transport extracts from the opening request
//! before the hub ever sees an [`crate::ConnectionId`].
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Maximum size, in bytes, of a single inbound frame. Oversize frames are a
/// policy violation: the connection is closed, not merely the frame dropped.
pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Opaque identifier for a connection, assigned by the transport on accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Credentials a transport can pull out of the handshake request before any
/// envelope is decoded: an auth token, a declared display name, and a
/// declared agent kind. A field is `None` when the client didn't supply it
/// through any of the three channels the handshake allows.
///
/// When a value is present in more than one channel, the transport resolves
/// it with header taking precedence over sub-protocol, which takes
/// precedence over query parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeCredentials {
    pub token: Option<String>,
    pub display_name: Option<String>,
    pub agent_type: Option<String>,
}

impl HandshakeCredentials {
    /// Merges `self` over `fallback`, keeping `self`'s fields where present
    /// and falling back to `fallback`'s otherwise. Used to combine
    /// higher-precedence sources (header) over lower ones (query).
    fn or(self, fallback: Self) -> Self {
        Self {
            token: self.token.or(fallback.token),
            display_name: self.display_name.or(fallback.display_name),
            agent_type: self.agent_type.or(fallback.agent_type),
        }
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that can send and receive JSON text frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends a frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the credentials extracted from this connection's handshake.
    fn handshake_credentials(&self) -> &HandshakeCredentials;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_equality() {
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(1);
        let c = ConnectionId::new(2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }

    #[test]
    fn test_handshake_credentials_header_beats_query() {
        let header = HandshakeCredentials {
            token: Some("from-header".into()),
            ..Default::default()
        };
        let query = HandshakeCredentials {
            token: Some("from-query".into()),
            display_name: Some("alice".into()),
            ..Default::default()
        };
        let merged = header.or(query);
        assert_eq!(merged.token.as_deref(), Some("from-header"));
        assert_eq!(merged.display_name.as_deref(), Some("alice"));
    }
}
