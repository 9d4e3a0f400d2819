//! Token verification.
//!
//! The hub doesn't care how a token was produced — it only needs something
//! implementing [`Authenticator`]. [`JwtAuthenticator`] is the production
//! implementation; tests use [`AllowAllAuthenticator`] the way an
//! integration test would stand up a fake identity provider.

#![allow(async_fn_in_trait)]

use std::collections::HashSet;
use std::sync::RwLock;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::claims::Claims;
use crate::error::AuthError;

/// Verifies a bearer token and returns the identity it grants.
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `token`, returning the claims it carries.
    ///
    /// `token` is `None` when the handshake supplied no credential through
    /// any channel — most implementations should treat that as
    /// [`AuthError::MissingToken`], but a development authenticator may
    /// choose to mint a guest identity instead.
    fn authenticate(&self, token: Option<&str>) -> impl std::future::Future<Output = Result<Claims, AuthError>> + Send;
}

/// Verifies HS256/HS384/HS512-signed tokens against a shared secret, with an
/// in-memory revocation set keyed by `jti`.
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
    revoked: RwLock<HashSet<String>>,
}

impl JwtAuthenticator {
    /// Builds an authenticator around an HMAC secret. `issuer`/`audience`,
    /// when given, are enforced on every token.
    pub fn new(secret: &[u8], algorithm: Algorithm, issuer: Option<&str>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }
        if let Some(aud) = audience {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Marks a token's `jti` as revoked. Future [`Self::authenticate`] calls
    /// for that `jti` fail even if the signature and expiry are still valid.
    pub fn revoke(&self, jti: impl Into<String>) {
        self.revoked.write().expect("revocation lock poisoned").insert(jti.into());
    }

    fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().expect("revocation lock poisoned").contains(jti)
    }
}

impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: Option<&str>) -> Result<Claims, AuthError> {
        let token = token.ok_or(AuthError::MissingToken)?;
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if let Some(jti) = &data.claims.jti {
            if self.is_revoked(jti) {
                return Err(AuthError::Revoked);
            }
        }
        Ok(data.claims)
    }
}

/// Mints a guest identity for any presented token, real or absent. Intended
/// for local development and integration tests, never production.
pub struct AllowAllAuthenticator;

impl Authenticator for AllowAllAuthenticator {
    async fn authenticate(&self, token: Option<&str>) -> Result<Claims, AuthError> {
        let sub = token.map(str::to_string).unwrap_or_else(|| "guest".to_string());
        Ok(Claims {
            sub,
            name: None,
            role: None,
            iat: 0,
            exp: u64::MAX,
            iss: None,
            aud: None,
            jti: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_with_exp(secret: &[u8], exp: u64) -> String {
        let claims = Claims {
            sub: "agent-1".into(),
            name: Some("Casey".into()),
            role: Some("player".into()),
            iat: 0,
            exp,
            iss: None,
            aud: None,
            jti: Some("jti-1".into()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[tokio::test]
    async fn test_jwt_authenticator_accepts_valid_token() {
        let secret = b"test-secret";
        let auth = JwtAuthenticator::new(secret, Algorithm::HS256, None, None);
        let token = token_with_exp(secret, 9_999_999_999);
        let claims = auth.authenticate(Some(&token)).await.unwrap();
        assert_eq!(claims.sub, "agent-1");
    }

    #[tokio::test]
    async fn test_jwt_authenticator_rejects_expired_token() {
        let secret = b"test-secret";
        let auth = JwtAuthenticator::new(secret, Algorithm::HS256, None, None);
        let token = token_with_exp(secret, 1);
        let result = auth.authenticate(Some(&token)).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_jwt_authenticator_rejects_missing_token() {
        let auth = JwtAuthenticator::new(b"secret", Algorithm::HS256, None, None);
        let result = auth.authenticate(None).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn test_jwt_authenticator_rejects_wrong_secret() {
        let auth = JwtAuthenticator::new(b"real-secret", Algorithm::HS256, None, None);
        let token = token_with_exp(b"wrong-secret", 9_999_999_999);
        let result = auth.authenticate(Some(&token)).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_jwt_authenticator_rejects_revoked_jti() {
        let secret = b"test-secret";
        let auth = JwtAuthenticator::new(secret, Algorithm::HS256, None, None);
        let token = token_with_exp(secret, 9_999_999_999);
        auth.revoke("jti-1");
        let result = auth.authenticate(Some(&token)).await;
        assert!(matches!(result, Err(AuthError::Revoked)));
    }

    #[tokio::test]
    async fn test_allow_all_authenticator_mints_guest_without_token() {
        let auth = AllowAllAuthenticator;
        let claims = auth.authenticate(None).await.unwrap();
        assert_eq!(claims.sub, "guest");
    }
}
