//! JWT claim shape accepted from clients.

use serde::{Deserialize, Serialize};

/// Claims carried by a Liku access token.
///
/// `sub` becomes the agent's stable identity across reconnects within the
/// token's lifetime; `role` seeds the agent's initial role, but a session
/// can still demote a player to spectator on forfeit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub iat: u64,
    pub exp: u64,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub jti: Option<String>,
}
