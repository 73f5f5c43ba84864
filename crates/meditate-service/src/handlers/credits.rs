//! Credit balance handlers.

use std::sync::Arc;

use axum::extract::State;
use serde::Deserialize;

use meditate_core::{CreditCheck, Profile, UserId};

use crate::error::ActionResponse;
use crate::extract::ApiJson;
use crate::identity::{AdminAuth, CallerIdentity};
use crate::state::AppState;

/// Check the caller's balance.
pub async fn check_credits(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> ActionResponse<CreditCheck> {
    state.ledger.check_credits(&caller.user_id).await.into()
}

/// Spend one of the caller's credits.
pub async fn deduct_credit(
    State(state): State<Arc<AppState>>,
    caller: CallerIdentity,
) -> ActionResponse<Profile> {
    state.ledger.deduct_credit(&caller.user_id).await.into()
}

/// Grant credits request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCreditsRequest {
    /// Profile to credit.
    pub user_id: UserId,
    /// Amount to add. Not sign-checked.
    pub amount: i64,
}

/// Grant credits to any user (admin only).
pub async fn add_credits(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    ApiJson(body): ApiJson<AddCreditsRequest>,
) -> ActionResponse<Profile> {
    state
        .ledger
        .add_credits(&body.user_id, body.amount)
        .await
        .into()
}
