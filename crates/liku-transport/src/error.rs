/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// A frame exceeded the transport's maximum payload size. The connection
    /// must be closed rather than the frame merely dropped.
    #[error("policy violation: frame of {0} bytes exceeds the size limit")]
    PolicyViolation(usize),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
