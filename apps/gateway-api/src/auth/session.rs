//! Session bridge: authenticates the WebSocket handshake against the
//! REST-issued session cookie.
//!
//! The validation routine is injected into the gateway as a trait object so
//! the handshake reuses the exact same logic (secret, cookie name, expiry) as
//! the REST layer rather than re-deriving it. Validation runs once per
//! handshake; the result is carried immutably on the connection for its whole
//! lifetime and never re-parsed per event.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Typed handshake result attached to a connection.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: i64,
    pub username: String,
}

/// Validates a raw handshake request. Returns `None` for anything that isn't
/// a live, well-formed session.
pub trait SessionValidator: Send + Sync {
    fn validate(&self, headers: &HeaderMap) -> Option<AuthedUser>;
}

/// Claims inside the session cookie's JWT (HS256, shared secret with the
/// REST layer, which issues and refreshes it at login).
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i64,
    pub username: String,
    pub exp: i64,
}

/// Production validator: session cookie carrying an HS256 JWT.
pub struct CookieSessionValidator {
    cookie_name: String,
    decoding: DecodingKey,
    validation: Validation,
}

impl CookieSessionValidator {
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Find the session cookie's value in a `Cookie` header.
    fn session_cookie<'a>(&self, header: &'a str) -> Option<&'a str> {
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == self.cookie_name).then_some(value)
        })
    }
}

impl SessionValidator for CookieSessionValidator {
    fn validate(&self, headers: &HeaderMap) -> Option<AuthedUser> {
        let header = headers.get(COOKIE)?.to_str().ok()?;
        let token = self.session_cookie(header)?;

        let claims = match jsonwebtoken::decode::<SessionClaims>(
            token,
            &self.decoding,
            &self.validation,
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(?e, "session cookie rejected");
                return None;
            }
        };

        Some(AuthedUser {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}
