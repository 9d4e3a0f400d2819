//! Wire types for the Liku envelope format.
//!
//! Every frame that crosses the transport is an [`InboundEnvelope`] (client
//! to server) or an [`OutboundEnvelope`] (server to client). The envelope
//! carries routing metadata; the payload/data body is an opaque JSON value
//! that the command router and downstream components interpret.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six frame kinds a client may send.
///
/// `key`/`action` cover universal input (menu navigation, directional
/// controls); `query` asks for read-only data; `ping` is the
/// application-level heartbeat probe; `subscribe`/`unsubscribe` manage a
/// connection's topic set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundKind {
    Key,
    Action,
    Query,
    Ping,
    Subscribe,
    Unsubscribe,
}

/// The seven frame kinds the server may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundKind {
    Welcome,
    State,
    Ack,
    Event,
    Result,
    Pong,
    Error,
}

/// A client-to-server frame.
///
/// `payload` is left as a raw [`serde_json::Value`] because its shape
/// depends entirely on `kind` and, for actions, on the specific command
/// name inside it — the codec's job stops at "this is well-formed JSON
/// shaped like an envelope", not at validating the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub kind: InboundKind,
    #[serde(default = "serde_json::Value::default")]
    pub payload: serde_json::Value,
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// A server-to-client frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default = "serde_json::Value::default")]
    pub data: serde_json::Value,
    /// Server wall-clock time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl OutboundEnvelope {
    pub fn new(kind: OutboundKind, data: serde_json::Value, timestamp: u64) -> Self {
        Self { kind, request_id: None, data, timestamp }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>, timestamp: u64) -> Self {
        Self::new(
            OutboundKind::Error,
            serde_json::json!({ "kind": kind.as_str(), "message": message.into() }),
            timestamp,
        )
    }
}

/// The closed vocabulary of error kinds surfaced to clients (spec §7).
///
/// Every variant maps to its own SCREAMING_SNAKE wire name via
/// [`ErrorKind::as_str`] — never format the Rust `Debug` representation
/// onto the wire, since renaming a variant would silently change the
/// client-visible string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidJson,
    InvalidMessage,
    MissingField,
    UnknownCommand,
    InvalidAction,
    InvalidKey,
    AuthFailed,
    RateLimited,
    NotFound,
    AlreadyStarted,
    NotInProgress,
    NotAPlayer,
    NotYourTurn,
    IllegalMove,
    NoFreeSlot,
    SpectatorsDisallowed,
    Muted,
    NotInRoom,
    MessageTooLong,
    EmptyMessage,
    Expired,
    SelfJoin,
    PermissionDenied,
    QueryTimeout,
    ServerAtCapacity,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::InvalidMessage => "INVALID_MESSAGE",
            Self::MissingField => "MISSING_FIELD",
            Self::UnknownCommand => "UNKNOWN_COMMAND",
            Self::InvalidAction => "INVALID_ACTION",
            Self::InvalidKey => "INVALID_KEY",
            Self::AuthFailed => "AUTH_FAILED",
            Self::RateLimited => "RATE_LIMITED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyStarted => "ALREADY_STARTED",
            Self::NotInProgress => "NOT_IN_PROGRESS",
            Self::NotAPlayer => "NOT_A_PLAYER",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::IllegalMove => "ILLEGAL_MOVE",
            Self::NoFreeSlot => "NO_FREE_SLOT",
            Self::SpectatorsDisallowed => "SPECTATORS_DISALLOWED",
            Self::Muted => "MUTED",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::MessageTooLong => "MESSAGE_TOO_LONG",
            Self::EmptyMessage => "EMPTY_MESSAGE",
            Self::Expired => "EXPIRED",
            Self::SelfJoin => "SELF_JOIN",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::QueryTimeout => "QUERY_TIMEOUT",
            Self::ServerAtCapacity => "SERVER_AT_CAPACITY",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent type, part of the identity surfaced in `welcome` and join events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Human,
    Ai,
    Spectator,
}

/// Agent role within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Player,
    Spectator,
    Admin,
}
