//! # Authentication Module
//!
//! Password hashing, access tokens and the request extractors that turn an
//! `Authorization: Bearer <token>` header into a caller identity.
//!
//! Passwords are hashed with Argon2 and stored in PHC string format. Tokens
//! are HS512 JWTs carrying the user id and user type, so capability checks
//! need no database round trip.
//!
//! Login hands out a short-lived access token and a longer-lived refresh
//! token. The `typ` claim tells them apart: only access tokens open API
//! routes, and only refresh tokens are accepted by the refresh endpoint.
//!
//! Three extractors cover every route:
//!
//! - [`CurrentViewer`] never rejects a missing header; the caller is anonymous
//! - [`Authenticated`] rejects anonymous callers with 401
//! - [`EventManager`] additionally requires `Capability::ManageEvents` (403)
//!
//! A header that is present but malformed, or a token that fails
//! verification, is always a 401.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{DateTime, Duration, Utc};
use eventdesk_core::{
    access::{self, Capability, Identity, Viewer},
    errors::{EventError, EventResult},
    models::user::UserType,
};
use eyre::Result;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{middleware::error_handling::AppError, ApiState};

/// Hashes a password using the Argon2 algorithm
///
/// A fresh random salt is generated for every call, and the result is a PHC
/// string that embeds the algorithm parameters alongside the hash.
///
/// # Example
///
/// ```rust
/// use eventdesk_api::middleware::auth::{hash_password, verify_password};
///
/// let hashed = hash_password("correct horse").unwrap();
/// assert!(verify_password("correct horse", &hashed).unwrap());
/// ```
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| eyre::eyre!("Error hashing password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Checks `password` against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash
/// cannot be parsed.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| eyre::eyre!("Invalid stored password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Token signing settings shared by the login handlers and the extractors.
#[derive(Clone)]
pub struct AuthSettings {
    jwt_secret: String,
    pub token_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl AuthSettings {
    /// Refresh tokens default to seven days.
    pub fn new(jwt_secret: impl Into<String>, token_ttl: Duration) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl,
            refresh_ttl: Duration::days(7),
        }
    }

    pub fn with_refresh_ttl(mut self, refresh_ttl: Duration) -> Self {
        self.refresh_ttl = refresh_ttl;
        self
    }

    fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.token_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub user_type: UserType,
    pub typ: TokenKind,
    pub exp: i64,
}

fn sign(
    settings: &AuthSettings,
    identity: &Identity,
    kind: TokenKind,
) -> EventResult<(String, DateTime<Utc>)> {
    let expires_at = Utc::now() + settings.ttl(kind);
    let claims = Claims {
        sub: identity.id,
        user_type: identity.user_type,
        typ: kind,
        exp: expires_at.timestamp(),
    };

    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| EventError::Internal(Box::new(e)))?;

    Ok((token, expires_at))
}

fn verify(settings: &AuthSettings, token: &str, expected: TokenKind) -> EventResult<Identity> {
    let invalid = || EventError::Authentication("Invalid or expired token".to_string());

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS512),
    )
    .map_err(|e| {
        debug!("Rejected {:?} token: {}", expected, e);
        invalid()
    })?;

    if data.claims.typ != expected {
        debug!(
            "Rejected {:?} token presented as {:?}",
            data.claims.typ, expected
        );
        return Err(invalid());
    }

    Ok(Identity {
        id: data.claims.sub,
        user_type: data.claims.user_type,
    })
}

/// Signs an access token for `identity`, returning it with its expiry.
pub fn issue_token(
    settings: &AuthSettings,
    identity: &Identity,
) -> EventResult<(String, DateTime<Utc>)> {
    sign(settings, identity, TokenKind::Access)
}

/// Signs a refresh token for `identity`, returning it with its expiry.
pub fn issue_refresh_token(
    settings: &AuthSettings,
    identity: &Identity,
) -> EventResult<(String, DateTime<Utc>)> {
    sign(settings, identity, TokenKind::Refresh)
}

/// Verifies signature, expiry and kind of an access token, yielding the
/// identity it vouches for.
pub fn decode_token(settings: &AuthSettings, token: &str) -> EventResult<Identity> {
    verify(settings, token, TokenKind::Access)
}

/// Same as [`decode_token`] for refresh tokens. Access tokens are rejected.
pub fn decode_refresh_token(settings: &AuthSettings, token: &str) -> EventResult<Identity> {
    verify(settings, token, TokenKind::Refresh)
}

/// Pulls the token out of an `Authorization: Bearer` header.
///
/// `Ok(None)` when the header is absent.
pub fn bearer_token(headers: &HeaderMap) -> EventResult<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let malformed = || EventError::Authentication("Malformed Authorization header".to_string());
    let value = value.to_str().map_err(|_| malformed())?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(Some(token.trim()))
        }
        _ => Err(malformed()),
    }
}

/// Resolves the caller of a request.
pub fn resolve_viewer(settings: &AuthSettings, headers: &HeaderMap) -> EventResult<Viewer> {
    match bearer_token(headers)? {
        None => Ok(Viewer::Anonymous),
        Some(token) => decode_token(settings, token).map(Viewer::Authenticated),
    }
}

/// Any caller, anonymous or not.
#[derive(Debug, Clone, Copy)]
pub struct CurrentViewer(pub Viewer);

/// A caller holding a valid token.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Identity);

/// A caller allowed to create, update and delete events.
#[derive(Debug, Clone, Copy)]
pub struct EventManager(pub Identity);

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for CurrentViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let viewer = resolve_viewer(&state.auth, &parts.headers)?;
        Ok(CurrentViewer(viewer))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_viewer(&state.auth, &parts.headers)? {
            Viewer::Authenticated(identity) => Ok(Authenticated(identity)),
            Viewer::Anonymous => Err(EventError::Authentication(
                "Authentication credentials were not provided".to_string(),
            )
            .into()),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<ApiState>> for EventManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(identity) = Authenticated::from_request_parts(parts, state).await?;
        access::authorize(&identity, Capability::ManageEvents)?;
        Ok(EventManager(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn settings() -> AuthSettings {
        AuthSettings::new("unit-test-secret", Duration::hours(1))
    }

    #[test]
    fn password_round_trip() {
        let hashed = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hashed).unwrap());
        assert!(!verify_password("wrong-pass", &hashed).unwrap());
    }

    #[test]
    fn token_carries_identity() {
        let identity = Identity {
            id: Uuid::new_v4(),
            user_type: UserType::Admin,
        };
        let (token, expires_at) = issue_token(&settings(), &identity).unwrap();

        assert!(expires_at > Utc::now());
        assert_eq!(decode_token(&settings(), &token).unwrap(), identity);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let identity = Identity {
            id: Uuid::new_v4(),
            user_type: UserType::Student,
        };
        let other = AuthSettings::new("another-secret", Duration::hours(1));
        let (token, _) = issue_token(&other, &identity).unwrap();

        assert!(matches!(
            decode_token(&settings(), &token),
            Err(EventError::Authentication(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let identity = Identity {
            id: Uuid::new_v4(),
            user_type: UserType::Student,
        };
        let expired = AuthSettings::new("unit-test-secret", Duration::hours(-2));
        let (token, _) = issue_token(&expired, &identity).unwrap();

        assert!(decode_token(&settings(), &token).is_err());
    }

    #[test]
    fn refresh_token_does_not_open_routes() {
        let identity = Identity {
            id: Uuid::new_v4(),
            user_type: UserType::Student,
        };
        let (refresh, _) = issue_refresh_token(&settings(), &identity).unwrap();
        let (access, _) = issue_token(&settings(), &identity).unwrap();

        assert!(matches!(
            decode_token(&settings(), &refresh),
            Err(EventError::Authentication(_))
        ));
        assert!(matches!(
            decode_refresh_token(&settings(), &access),
            Err(EventError::Authentication(_))
        ));
        assert_eq!(decode_refresh_token(&settings(), &refresh).unwrap(), identity);
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        let identity = Identity {
            id: Uuid::new_v4(),
            user_type: UserType::Admin,
        };
        let settings = settings().with_refresh_ttl(Duration::days(30));
        let (_, access_expiry) = issue_token(&settings, &identity).unwrap();
        let (_, refresh_expiry) = issue_refresh_token(&settings, &identity).unwrap();

        assert!(refresh_expiry > access_expiry + Duration::days(29));
    }

    #[test]
    fn missing_header_is_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(resolve_viewer(&settings(), &headers).unwrap(), Viewer::Anonymous);
    }

    #[test]
    fn non_bearer_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(
            resolve_viewer(&settings(), &headers),
            Err(EventError::Authentication(_))
        ));
    }
}
