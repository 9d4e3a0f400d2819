/// Errors raised while authenticating a handshake.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token was present in any of the three handshake channels.
    #[error("no token supplied")]
    MissingToken,

    /// The token's signature did not validate, it was malformed, or a
    /// required claim (`exp`, `iss`, `aud`) failed verification.
    #[error("token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// The token's `jti` is on the revocation list.
    #[error("token revoked")]
    Revoked,
}
