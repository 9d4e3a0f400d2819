use liku_transport::ConnectionId;

use crate::agent::AgentId;

/// Errors raised by the agent registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No agent exists with the given id.
    #[error("agent not found: {0}")]
    NotFound(AgentId),

    /// No agent is bound to the given connection.
    #[error("no agent bound to connection {0}")]
    ConnectionNotFound(ConnectionId),
}
