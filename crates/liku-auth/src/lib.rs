//! Bearer-token authentication for the connection hub.
//!
//! The hub hands whatever credential it extracted from the handshake to an
//! [`Authenticator`] and gets back either [`claims::Claims`] or an
//! [`AuthError`]. Everything downstream — agent identity, role — is derived
//! from those claims, never from the raw token again.

mod authenticator;
mod claims;
mod error;

pub use authenticator::{AllowAllAuthenticator, Authenticator, JwtAuthenticator};
pub use claims::Claims;
pub use error::AuthError;

pub use jsonwebtoken::Algorithm;
