//! Profile actions: create, read, update, delete, and the login bootstrap.

use std::future::Future;
use std::sync::Arc;

use meditate_core::{
    ActionState, FailureKind, LedgerError, NewProfile, Profile, ProfilePatch, Result, UserId,
};
use meditate_store::{ProfileStore, StoreError};

use crate::outcome;
use crate::retry::{with_retry, RetryPolicy};

/// Profile CRUD over an injected profile store.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    default_credits: i64,
    retry: RetryPolicy,
}

impl ProfileService {
    /// Create a service whose new profiles start with `default_credits`.
    #[must_use]
    pub fn new(store: Arc<dyn ProfileStore>, default_credits: i64) -> Self {
        Self {
            store,
            default_credits,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for conflicting writes.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Insert a new profile. Fails if one already exists.
    pub async fn create_profile(&self, new: NewProfile) -> ActionState<Profile> {
        let user_id = new.user_id.clone();
        match self.insert(new).await {
            Ok(profile) => {
                tracing::info!(user_id = %user_id, credits = %profile.credits, "Profile created");
                ActionState::success("Profile created successfully", profile)
            }
            Err(e) => outcome::failure(
                "create_profile",
                user_id.as_str(),
                &e,
                "Failed to create profile",
            ),
        }
    }

    /// Fetch a profile.
    pub async fn get_profile(&self, user_id: &UserId) -> ActionState<Profile> {
        let result = self
            .store
            .get_profile(user_id)
            .await
            .map_err(LedgerError::from)
            .and_then(|p| p.ok_or_else(|| LedgerError::not_found(user_id)));

        match result {
            Ok(profile) => ActionState::success("Profile retrieved successfully", profile),
            Err(e) => {
                outcome::failure("get_profile", user_id.as_str(), &e, "Failed to get profile")
            }
        }
    }

    /// Apply a partial update.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> ActionState<Profile> {
        let result = self
            .patch(user_id.as_str(), patch, || {
                self.store.update_profile(user_id, patch)
            })
            .await;

        match result {
            Ok(profile) => {
                tracing::info!(user_id = %user_id, "Profile updated");
                ActionState::success("Profile updated successfully", profile)
            }
            Err(LedgerError::NotFound { .. }) => {
                ActionState::failure(FailureKind::NotFound, "Profile not found to update")
            }
            Err(e) => outcome::failure(
                "update_profile",
                user_id.as_str(),
                &e,
                "Failed to update profile",
            ),
        }
    }

    /// Apply a partial update to the profile linked to a Stripe customer.
    pub async fn update_profile_by_stripe_customer_id(
        &self,
        stripe_customer_id: &str,
        patch: &ProfilePatch,
    ) -> ActionState<Profile> {
        let result = self
            .patch(stripe_customer_id, patch, || {
                self.store
                    .update_profile_by_stripe_customer_id(stripe_customer_id, patch)
            })
            .await;

        match result {
            Ok(profile) => {
                tracing::info!(
                    user_id = %profile.user_id,
                    stripe_customer_id,
                    "Profile updated by Stripe customer ID"
                );
                ActionState::success(
                    "Profile updated by Stripe customer ID successfully",
                    profile,
                )
            }
            Err(LedgerError::NotFound { .. }) => ActionState::failure(
                FailureKind::NotFound,
                "Profile not found by Stripe customer ID",
            ),
            Err(e) => outcome::failure(
                "update_profile_by_stripe_customer_id",
                stripe_customer_id,
                &e,
                "Failed to update profile by Stripe customer ID",
            ),
        }
    }

    /// Delete a profile. Deleting an absent profile also succeeds.
    pub async fn delete_profile(&self, user_id: &UserId) -> ActionState<()> {
        let result = with_retry(self.retry, "delete_profile", || {
            self.store.delete_profile(user_id)
        })
        .await;

        match result {
            Ok(removed) => {
                tracing::info!(user_id = %user_id, removed = %removed, "Profile deleted");
                ActionState::success("Profile deleted successfully", ())
            }
            Err(e) => outcome::failure(
                "delete_profile",
                user_id.as_str(),
                &LedgerError::from(e),
                "Failed to delete profile",
            ),
        }
    }

    /// Make sure the caller has a profile, creating one on first sight.
    ///
    /// Concurrent first requests for the same identity are resolved by
    /// re-reading after a lost insert race.
    pub async fn ensure_profile(&self, user_id: &UserId) -> ActionState<Profile> {
        match self.get_or_create(user_id).await {
            Ok(profile) => ActionState::success("Profile ready", profile),
            Err(e) => outcome::failure(
                "ensure_profile",
                user_id.as_str(),
                &e,
                "Failed to create profile",
            ),
        }
    }

    async fn insert(&self, new: NewProfile) -> Result<Profile> {
        new.validate()?;
        let profile = Profile::from_new(new, self.default_credits);
        let stored = with_retry(self.retry, "create_profile", || {
            self.store.insert_profile(&profile)
        })
        .await?;
        Ok(stored)
    }

    async fn patch<F, Fut>(&self, subject: &str, patch: &ProfilePatch, op: F) -> Result<Profile>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = meditate_store::Result<Option<Profile>>>,
    {
        patch.validate()?;
        with_retry(self.retry, "update_profile", op)
            .await?
            .ok_or_else(|| LedgerError::not_found(subject))
    }

    async fn get_or_create(&self, user_id: &UserId) -> Result<Profile> {
        if let Some(profile) = self.store.get_profile(user_id).await? {
            return Ok(profile);
        }

        let profile = Profile::new(user_id.clone(), self.default_credits);
        match self.store.insert_profile(&profile).await {
            Ok(created) => {
                tracing::info!(
                    user_id = %user_id,
                    credits = %created.credits,
                    "Profile bootstrapped on first login"
                );
                Ok(created)
            }
            Err(StoreError::AlreadyExists(_)) => self
                .store
                .get_profile(user_id)
                .await?
                .ok_or_else(|| {
                    LedgerError::StorageFailure("profile vanished during bootstrap".into())
                }),
            Err(e) => Err(e.into()),
        }
    }
}
