//! In-memory storage implementation.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use meditate_core::{CreditGuard, CreditMutation, Profile, ProfilePatch, UserId};

use crate::error::{Result, StoreError};
use crate::{ProfileStore, UpdateOutcome};

/// In-memory profile store.
///
/// Each write holds the map's write lock for its whole read-check-write, so a
/// conditional update is atomic with respect to every other writer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: RwLock<HashMap<UserId, Profile>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Whether the store holds no profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<UserId, Profile>>> {
        self.profiles
            .read()
            .map_err(|_| StoreError::Database("profile map lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, Profile>>> {
        self.profiles
            .write()
            .map_err(|_| StoreError::Database("profile map lock poisoned".into()))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        let mut profiles = self.write()?;
        if profiles.contains_key(&profile.user_id) {
            return Err(StoreError::AlreadyExists(profile.user_id.to_string()));
        }
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(profile.clone())
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        Ok(self.read()?.get(user_id).cloned())
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        let mut profiles = self.write()?;
        Ok(profiles.get_mut(user_id).map(|profile| {
            profile.apply_patch(patch);
            profile.clone()
        }))
    }

    async fn update_profile_by_stripe_customer_id(
        &self,
        stripe_customer_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        let mut profiles = self.write()?;
        Ok(profiles
            .values_mut()
            .find(|p| p.stripe_customer_id.as_deref() == Some(stripe_customer_id))
            .map(|profile| {
                profile.apply_patch(patch);
                profile.clone()
            }))
    }

    async fn delete_profile(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.write()?.remove(user_id).is_some())
    }

    async fn conditional_update(
        &self,
        user_id: &UserId,
        mutation: CreditMutation,
        guard: Option<CreditGuard>,
    ) -> Result<UpdateOutcome> {
        let mut profiles = self.write()?;
        let Some(profile) = profiles.get_mut(user_id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if guard.is_some_and(|g| !g.allows(profile)) {
            return Ok(UpdateOutcome::Rejected(profile.clone()));
        }

        profile
            .apply_mutation(mutation)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(UpdateOutcome::Applied(profile.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use meditate_core::Membership;

    async fn store_with(credits: i64) -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let user_id = UserId::generate();
        store
            .insert_profile(&Profile::new(user_id.clone(), credits))
            .await
            .unwrap();
        (store, user_id)
    }

    #[tokio::test]
    async fn profile_crud() {
        let (store, user_id) = store_with(0).await;

        let dup = store.insert_profile(&Profile::new(user_id.clone(), 0)).await;
        assert!(matches!(dup, Err(StoreError::AlreadyExists(_))));

        let patch = ProfilePatch {
            membership: Some(Membership::Pro),
            stripe_customer_id: Some("cus_42".into()),
            ..ProfilePatch::default()
        };
        let updated = store.update_profile(&user_id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.membership, Membership::Pro);

        let by_customer = store
            .update_profile_by_stripe_customer_id(
                "cus_42",
                &ProfilePatch {
                    credits: Some(9),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_customer.user_id, user_id);
        assert_eq!(by_customer.credits, 9);

        assert!(store
            .update_profile_by_stripe_customer_id("cus_missing", &patch)
            .await
            .unwrap()
            .is_none());

        assert!(store.delete_profile(&user_id).await.unwrap());
        assert!(!store.delete_profile(&user_id).await.unwrap());
        assert!(store.get_profile(&user_id).await.unwrap().is_none());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn guarded_debit_applies_and_rejects() {
        let (store, user_id) = store_with(1).await;

        let first = store
            .conditional_update(&user_id, CreditMutation::debit(), Some(CreditGuard::debit()))
            .await
            .unwrap();
        assert!(matches!(first, UpdateOutcome::Applied(ref p) if p.credits == 0 && p.total_usage_count == 1));

        let second = store
            .conditional_update(&user_id, CreditMutation::debit(), Some(CreditGuard::debit()))
            .await
            .unwrap();
        assert!(matches!(second, UpdateOutcome::Rejected(ref p) if p.credits == 0 && p.total_usage_count == 1));
    }

    #[tokio::test]
    async fn missing_profile() {
        let store = MemoryStore::new();
        let outcome = store
            .conditional_update(&UserId::generate(), CreditMutation::grant(5), None)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
    }

    #[tokio::test]
    async fn overflow_is_an_error_and_writes_nothing() {
        let (store, user_id) = store_with(i64::MAX).await;
        let result = store
            .conditional_update(&user_id, CreditMutation::grant(1), None)
            .await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        let profile = store.get_profile(&user_id).await.unwrap().unwrap();
        assert_eq!(profile.credits, i64::MAX);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_guarded_debits_never_go_negative() {
        let (store, user_id) = store_with(5).await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            let user_id = user_id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .conditional_update(&user_id, CreditMutation::debit(), Some(CreditGuard::debit()))
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), UpdateOutcome::Applied(_)) {
                applied += 1;
            }
        }

        let profile = store.get_profile(&user_id).await.unwrap().unwrap();
        assert_eq!(applied, 5);
        assert_eq!(profile.credits, 0);
        assert_eq!(profile.total_usage_count, 5);
    }
}
