//! Authentication and role guards.
//!
//! This module provides extractors for:
//! - `AuthUser` - a valid HS256 bearer token; no profile lookup
//! - `CurrentUser` - a valid token plus the caller's stored profile
//! - `CreatorUser` - a profile with creator access (role or channel)
//! - `AdminUser` - a profile with the admin role
//!
//! Tokens are issued elsewhere. They are read from the `Authorization:
//! Bearer` header, falling back to the `accessToken` cookie.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use vidpay_core::{Capability, User, UserId};
use vidpay_store::Store;

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Cookie consulted when no bearer header is present.
const TOKEN_COOKIE: &str = "accessToken";

/// JWT claims accepted by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Expiration time.
    pub exp: i64,
    /// Audience; a string or a list of strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    /// Issued at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

/// An authenticated caller with a stored profile.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// The caller's profile.
    pub user: User,
}

/// A caller allowed to use creator endpoints.
#[derive(Debug, Clone)]
pub struct CreatorUser {
    /// The caller's profile.
    pub user: User,
}

/// A caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser {
    /// The caller's profile.
    pub user: User,
}

/// Validate `token` and return the user it names.
pub fn verify_token(config: &ServiceConfig, token: &str) -> Result<UserId, ApiError> {
    let secret = config.auth_secret.as_deref().ok_or(ApiError::Unauthorized)?;

    let mut validation = Validation::new(Algorithm::HS256);
    match config.auth_audience.as_deref() {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized
    })?;

    data.claims
        .sub
        .parse::<UserId>()
        .map_err(|_| ApiError::Unauthorized)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn cookie_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or(ApiError::Unauthorized)?;

        let user_id = verify_token(&state.config, token)?;
        Ok(AuthUser { user_id })
    }
}

/// Load the caller's profile and check `capability`.
async fn load_user(
    parts: &mut Parts,
    state: &Arc<AppState>,
    capability: Capability,
) -> Result<User, ApiError> {
    let AuthUser { user_id } = AuthUser::from_request_parts(parts, state).await?;

    let user = state
        .store
        .get_user(&user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    if !user.can(capability) {
        tracing::warn!(
            user_id = %user_id,
            role = %user.role,
            required = ?capability,
            "Access denied"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(user)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = load_user(parts, state, Capability::Authenticated).await?;
        Ok(CurrentUser { user })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CreatorUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = load_user(parts, state, Capability::Creator).await?;
        Ok(CreatorUser { user })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = load_user(parts, state, Capability::Admin).await?;
        Ok(AdminUser { user })
    }
}
