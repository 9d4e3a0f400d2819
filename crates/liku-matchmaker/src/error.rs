/// Failure modes for matchmaking operations, mapped onto the wire's closed
/// `ErrorKind` vocabulary by the command router.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("match code not found")]
    NotFound,
    #[error("match ticket has expired")]
    Expired,
    #[error("match ticket has already been matched")]
    AlreadyMatched,
    #[error("host cannot join their own ticket")]
    SelfJoin,
    #[error("only the host may cancel this ticket")]
    NotHost,
    #[error(transparent)]
    Session(#[from] liku_session::SessionError),
}
