//! Caller identity extractors.
//!
//! - `CallerIdentity` - the end user, from the `x-user-id` header set by the
//!   fronting identity provider
//! - `AdminAuth` - privileged callers, via the `x-admin-key` header

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use meditate_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the admin API key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// The user a request acts on behalf of.
///
/// The header is trusted as-is; the identity provider in front of the
/// service is responsible for verifying it.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// The user ID.
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?
            .parse::<UserId>()
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected caller identity");
                ApiError::Unauthorized
            })?;

        Ok(Self { user_id })
    }
}

/// Admin authentication for privileged endpoints.
///
/// Always rejects when no admin key is configured.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected = state
            .config
            .admin_api_key
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;

        if provided != expected {
            tracing::warn!("Admin request with invalid key");
            return Err(ApiError::Unauthorized);
        }

        Ok(Self)
    }
}
