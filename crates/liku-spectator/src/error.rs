#[derive(Debug, thiserror::Error)]
pub enum SpectatorError {
    #[error("broadcaster for session {0} is unavailable")]
    Unavailable(liku_session::SessionId),
    #[error("spectator cap reached for this session")]
    CapacityExceeded,
}
