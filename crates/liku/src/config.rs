//! Hub configuration, per spec.md §6 "Server configuration".

use std::collections::HashMap;
use std::time::Duration;

use liku_auth::Algorithm;

/// TLS material for the hub's listener. This workspace's
/// [`liku_transport::WebSocketTransport`] terminates plaintext connections
/// only — a production deployment terminates TLS at a reverse proxy in
/// front of it, the same way `arcforge`'s `WebSocketTransport` never grew
/// TLS support either. Kept here so a future transport can read it without
/// another config-shape change.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub certificate_path: String,
    pub key_path: String,
    pub ca_chain_path: Option<String>,
    pub min_version: TlsVersion,
    pub cipher_list: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

/// Token-auth configuration. When `enabled` is `false` the hub accepts any
/// connection via [`liku_auth::AllowAllAuthenticator`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub secret: Vec<u8>,
    pub algorithm: Algorithm,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { enabled: false, secret: Vec::new(), algorithm: Algorithm::HS256, issuer: None, audience: None }
    }
}

/// Per-game-type tunables the hub needs to stand up a session: the
/// spectator broadcaster's cadence, its spectator cap, and the turn-time
/// budget fed into [`liku_session::SessionConfig`].
#[derive(Debug, Clone)]
pub struct GameProfile {
    pub broadcast_interval: Duration,
    pub spectator_cap: usize,
    pub turn_time_budget: Option<Duration>,
}

impl Default for GameProfile {
    fn default() -> Self {
        Self { broadcast_interval: Duration::from_millis(100), spectator_cap: 50, turn_time_budget: Some(Duration::from_secs(30)) }
    }
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind_addr: String,
    /// The health/metrics sibling listens on `bind_port + 1` by default;
    /// set explicitly to override.
    pub health_bind_addr: Option<String>,
    pub max_clients: usize,
    pub heartbeat_interval: Duration,
    pub rate_limit: liku_ratelimit::LimiterConfig,
    pub game_profiles: HashMap<String, GameProfile>,
    pub default_game_profile: GameProfile,
    pub auth: AuthConfig,
    pub tls: Option<TlsConfig>,
}

impl HubConfig {
    pub fn game_profile(&self, game_type: &str) -> &GameProfile {
        self.game_profiles.get(game_type).unwrap_or(&self.default_game_profile)
    }

    /// Derives the health sibling's bind address from `bind_addr` by
    /// incrementing its port, unless [`Self::health_bind_addr`] was set.
    pub fn resolved_health_bind_addr(&self) -> String {
        if let Some(addr) = &self.health_bind_addr {
            return addr.clone();
        }
        match self.bind_addr.rsplit_once(':') {
            Some((host, port)) => match port.parse::<u16>() {
                Ok(port) => format!("{host}:{}", port.saturating_add(1)),
                Err(_) => format!("{}:0", self.bind_addr),
            },
            None => format!("{}:0", self.bind_addr),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            health_bind_addr: None,
            max_clients: 1000,
            heartbeat_interval: Duration::from_secs(30),
            rate_limit: liku_ratelimit::LimiterConfig::default(),
            game_profiles: HashMap::new(),
            default_game_profile: GameProfile::default(),
            auth: AuthConfig::default(),
            tls: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_health_bind_addr_increments_port() {
        let config = HubConfig { bind_addr: "0.0.0.0:9000".into(), ..HubConfig::default() };
        assert_eq!(config.resolved_health_bind_addr(), "0.0.0.0:9001");
    }

    #[test]
    fn test_resolved_health_bind_addr_honors_explicit_override() {
        let config = HubConfig { bind_addr: "0.0.0.0:9000".into(), health_bind_addr: Some("0.0.0.0:7000".into()), ..HubConfig::default() };
        assert_eq!(config.resolved_health_bind_addr(), "0.0.0.0:7000");
    }

    #[test]
    fn test_game_profile_falls_back_to_default() {
        let config = HubConfig::default();
        let profile = config.game_profile("tic_tac_toe");
        assert_eq!(profile.spectator_cap, config.default_game_profile.spectator_cap);
    }
}
