//! The credit ledger.
//!
//! Three operations over a profile's balance: check, deduct one credit, add
//! credits. A debit is a single guarded store update (`credits >= 1`, then
//! `credits -= 1` and `total_usage_count += 1`), so concurrent debits against
//! the same profile can never push the balance below zero. There is no
//! apply-then-compensate step and no in-process caching of the balance.
//!
//! Each public operation returns an [`ActionState`]; errors are logged and
//! converted here and never propagate further.
//!
//! If a caller drops an operation mid-flight the store write may or may not
//! have committed. Re-check with [`CreditLedger::check_credits`].

use std::sync::Arc;

use meditate_core::{
    ActionState, CreditCheck, CreditGuard, CreditMutation, LedgerError, Profile, Result, UserId,
};
use meditate_store::{ProfileStore, UpdateOutcome};

use crate::outcome;
use crate::retry::{with_retry, RetryPolicy};

/// Credit balance operations over an injected profile store.
#[derive(Clone)]
pub struct CreditLedger {
    store: Arc<dyn ProfileStore>,
    retry: RetryPolicy,
}

impl CreditLedger {
    /// Create a ledger over `store` with the default retry policy.
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for conflicting writes.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Read the current balance. `has_credits` is `credits > 0`.
    pub async fn check_credits(&self, user_id: &UserId) -> ActionState<CreditCheck> {
        match self.read_balance(user_id).await {
            Ok(check) => ActionState::success("Credits checked successfully", check),
            Err(e) => outcome::failure(
                "check_credits",
                user_id.as_str(),
                &e,
                "Failed to check credits",
            ),
        }
    }

    /// Spend one credit and count one usage, atomically.
    ///
    /// On success the envelope carries the post-debit profile. An exhausted
    /// balance yields an `insufficient_credits` failure with nothing written.
    pub async fn deduct_credit(&self, user_id: &UserId) -> ActionState<Profile> {
        match self.debit(user_id).await {
            Ok(profile) => {
                tracing::info!(
                    user_id = %user_id,
                    credits = %profile.credits,
                    total_usage_count = %profile.total_usage_count,
                    "Credit deducted"
                );
                ActionState::success("Credit deducted successfully", profile)
            }
            Err(e) => outcome::failure(
                "deduct_credit",
                user_id.as_str(),
                &e,
                "Failed to deduct credit",
            ),
        }
    }

    /// Add `amount` credits atomically.
    ///
    /// The amount is not sign-checked: a negative amount lowers the balance
    /// with no floor. Such grants are logged at `warn`.
    pub async fn add_credits(&self, user_id: &UserId, amount: i64) -> ActionState<Profile> {
        match self.grant(user_id, amount).await {
            Ok(profile) => {
                tracing::info!(
                    user_id = %user_id,
                    amount = %amount,
                    credits = %profile.credits,
                    "Credits added"
                );
                ActionState::success("Credits added successfully", profile)
            }
            Err(e) => outcome::failure(
                "add_credits",
                user_id.as_str(),
                &e,
                "Failed to add credits",
            ),
        }
    }

    async fn read_balance(&self, user_id: &UserId) -> Result<CreditCheck> {
        let profile = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| LedgerError::not_found(user_id))?;
        Ok(CreditCheck::from(&profile))
    }

    async fn debit(&self, user_id: &UserId) -> Result<Profile> {
        let outcome = with_retry(self.retry, "deduct_credit", || {
            self.store.conditional_update(
                user_id,
                CreditMutation::debit(),
                Some(CreditGuard::debit()),
            )
        })
        .await?;

        match outcome {
            UpdateOutcome::Applied(profile) => Ok(profile),
            UpdateOutcome::Rejected(profile) => Err(LedgerError::InsufficientCredits {
                balance: profile.credits,
            }),
            UpdateOutcome::Missing => Err(LedgerError::not_found(user_id)),
        }
    }

    async fn grant(&self, user_id: &UserId, amount: i64) -> Result<Profile> {
        if amount < 0 {
            tracing::warn!(
                user_id = %user_id,
                amount = %amount,
                "Applying negative credit grant; no balance floor is enforced"
            );
        }

        let outcome = with_retry(self.retry, "add_credits", || {
            self.store
                .conditional_update(user_id, CreditMutation::grant(amount), None)
        })
        .await?;

        match outcome {
            UpdateOutcome::Applied(profile) => Ok(profile),
            UpdateOutcome::Missing => Err(LedgerError::not_found(user_id)),
            UpdateOutcome::Rejected(_) => Err(LedgerError::StorageFailure(
                "unguarded credit grant was rejected".into(),
            )),
        }
    }
}
