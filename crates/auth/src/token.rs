//! Signed tokens: browser session tokens and per-actor policy tokens.
//!
//! Both are HS256 JWTs. Signature checking is done by `jsonwebtoken`; the
//! time window is checked here against an explicit `now` so validation stays
//! deterministic under test.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gitclub_core::UserId;

use crate::value::Value;

/// Lifetime of a minted actor token, in seconds.
pub const ACTOR_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("malformed or badly signed token: {0}")]
    Malformed(String),

    #[error("cannot mint a token for partial actor {0}")]
    PartialActor(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Claims carried by a browser session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The signed-in user.
    pub sub: UserId,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Claims of an actor-scoped policy token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorClaims {
    pub actor_type: String,
    pub actor_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Check an `iat`/`exp` window against `now`.
pub fn validate_window(iat: i64, exp: i64, now: DateTime<Utc>) -> Result<(), TokenError> {
    if exp <= iat {
        return Err(TokenError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < iat {
        return Err(TokenError::NotYetValid);
    }
    if now >= exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}

/// Resolves a bearer token to the signed-in user.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// Shared-secret HS256 session tokens.
#[derive(Clone)]
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a session token for `user` valid for `ttl` from `now`.
    pub fn issue(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims = SessionClaims {
            sub: user,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let claims = decode::<SessionClaims>(token, &self.decoding)?;
        validate_window(claims.iat, claims.exp, now)?;
        Ok(claims)
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Hs256JwtValidator { .. }")
    }
}

/// Mint a short-lived token scoping policy requests to `actor`.
///
/// The actor must be bound.
pub fn mint_actor_token(
    root_secret: &[u8],
    actor: &Value,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let (Some(actor_type), Some(actor_id)) = (actor.kind(), actor.id()) else {
        return Err(TokenError::PartialActor(actor.to_string()));
    };
    let claims = ActorClaims {
        actor_type: actor_type.to_string(),
        actor_id: actor_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ACTOR_TOKEN_TTL_SECS)).timestamp(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(root_secret),
    )
    .map_err(|e| TokenError::Encoding(e.to_string()))
}

/// Decode and verify an actor token minted with the same root secret.
pub fn verify_actor_token(
    root_secret: &[u8],
    token: &str,
    now: DateTime<Utc>,
) -> Result<ActorClaims, TokenError> {
    let claims = decode::<ActorClaims>(token, &DecodingKey::from_secret(root_secret))?;
    validate_window(claims.iat, claims.exp, now)?;
    Ok(claims)
}

fn decode<C: serde::de::DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<C, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // The window is checked against the caller's clock instead.
    validation.validate_exp = false;
    jsonwebtoken::decode::<C>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Malformed(e.to_string()))
}
