//! Profile handlers.

use std::sync::Arc;

use axum::extract::{Path, State};

use meditate_core::{NewProfile, Profile, ProfilePatch, UserId};

use crate::error::{ActionResponse, ApiError};
use crate::extract::ApiJson;
use crate::identity::{AdminAuth, CallerIdentity};
use crate::state::AppState;

/// Get the caller's profile, creating it on first login.
pub async fn bootstrap(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> ActionResponse<Profile> {
    state.profiles.ensure_profile(&caller.user_id).await.into()
}

/// Get the caller's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> ActionResponse<Profile> {
    state.profiles.get_profile(&caller.user_id).await.into()
}

/// Delete the caller's profile.
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> ActionResponse<()> {
    state.profiles.delete_profile(&caller.user_id).await.into()
}

/// Create a profile (admin only).
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    ApiJson(body): ApiJson<NewProfile>,
) -> ActionResponse<Profile> {
    state.profiles.create_profile(body).await.into()
}

/// Update a profile by user ID (admin only).
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(user_id): Path<String>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> Result<ActionResponse<Profile>, ApiError> {
    let user_id = user_id
        .parse::<UserId>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(state.profiles.update_profile(&user_id, &patch).await.into())
}

/// Update a profile by Stripe customer ID (admin only).
pub async fn update_by_stripe_customer(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(customer_id): Path<String>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ActionResponse<Profile> {
    state
        .profiles
        .update_profile_by_stripe_customer_id(&customer_id, &patch)
        .await
        .into()
}
