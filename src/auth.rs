use crate::{config::JwtKey, error::ApiError, AppState};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;

// ── Token verification ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,
}

/// Claims read from a verified bearer token.
///
/// Identity providers disagree on where the caller id lives, so `uid`,
/// `user_id` and `sub` are all accepted, in that order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    pub uid: Option<String>,
    pub user_id: Option<String>,
    pub sub: Option<String>,
}

impl Claims {
    pub fn caller_id(&self) -> Option<&str> {
        [&self.uid, &self.user_id, &self.sub]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|id| !id.is_empty())
    }
}

/// Verifies bearer tokens on behalf of an identity provider.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// `jsonwebtoken`-backed verifier for HS256 or RS256 tokens.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(
        key: &JwtKey,
        audience: Option<&str>,
        issuer: Option<&str>,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let (key, algorithm) = match key {
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            JwtKey::RsaPem(pem) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
        }

        Ok(Self { key, validation })
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })
    }
}

// ── AuthUser extractor ─────────────────────────────────────────────────────

/// Extractor that enforces bearer authentication on any handler that takes
/// it. The raw token is kept so it can be forwarded to the history service,
/// which authorises the caller itself.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized("Missing or malformed Authorization header".into())
                })?;

        let state = Arc::<AppState>::from_ref(state);
        let claims = state
            .verifier
            .verify(bearer.token())
            .map_err(|_| ApiError::Unauthorized("Invalid or expired ID token".into()))?;

        let uid = claims
            .caller_id()
            .ok_or_else(|| ApiError::Unauthorized("Invalid token: missing uid".into()))?
            .to_owned();

        Ok(AuthUser {
            uid,
            token: bearer.token().to_owned(),
        })
    }
}
