//! `RocksDB` storage implementation.
//!
//! Profiles are stored as CBOR in the `profiles` column family. Writes go
//! through a single in-process write lock, so the read-check-write of a
//! conditional update cannot interleave with another writer. The database
//! must therefore not be shared with another process.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, WriteBatch,
};

use meditate_core::{CreditGuard, CreditMutation, Profile, ProfilePatch, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{ProfileStore, UpdateOutcome};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn load(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let cf = self.cf(cf::PROFILES)?;
        self.db
            .get_cf(&cf, keys::profile_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Write `after`, keeping the Stripe customer index in step with `before`.
    fn store(&self, before: Option<&Profile>, after: &Profile) -> Result<()> {
        let cf_profiles = self.cf(cf::PROFILES)?;
        let cf_index = self.cf(cf::PROFILES_BY_STRIPE_CUSTOMER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_profiles,
            keys::profile_key(&after.user_id),
            Self::serialize(after)?,
        );

        let old_customer = before.and_then(|p| p.stripe_customer_id.as_deref());
        let new_customer = after.stripe_customer_id.as_deref();
        if old_customer != new_customer {
            if let Some(old) = old_customer {
                self.release_index_entry(&mut batch, old, &after.user_id)?;
            }
            if let Some(new) = new_customer {
                batch.put_cf(
                    &cf_index,
                    keys::stripe_customer_key(new),
                    keys::profile_key(&after.user_id),
                );
            }
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Queue removal of `customer`'s index entry if it still points at `owner`.
    ///
    /// Another profile may have claimed the same customer ID since; its entry
    /// must survive. Caller holds the write lock.
    fn release_index_entry(
        &self,
        batch: &mut WriteBatch,
        customer: &str,
        owner: &UserId,
    ) -> Result<()> {
        let cf_index = self.cf(cf::PROFILES_BY_STRIPE_CUSTOMER)?;
        let key = keys::stripe_customer_key(customer);
        let current = self
            .db
            .get_cf(&cf_index, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if let Some(value) = current {
            if keys::user_id_from_index_value(&value)? == *owner {
                batch.delete_cf(&cf_index, key);
            }
        }
        Ok(())
    }

    fn patch_locked(&self, user_id: &UserId, patch: &ProfilePatch) -> Result<Option<Profile>> {
        let Some(before) = self.load(user_id)? else {
            return Ok(None);
        };
        let mut after = before.clone();
        after.apply_patch(patch);
        self.store(Some(&before), &after)?;
        Ok(Some(after))
    }
}

#[async_trait]
impl ProfileStore for RocksStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        let _guard = self.lock()?;
        if self.load(&profile.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists(profile.user_id.to_string()));
        }
        self.store(None, profile)?;
        Ok(profile.clone())
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        self.load(user_id)
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        let _guard = self.lock()?;
        self.patch_locked(user_id, patch)
    }

    async fn update_profile_by_stripe_customer_id(
        &self,
        stripe_customer_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        let _guard = self.lock()?;
        let cf_index = self.cf(cf::PROFILES_BY_STRIPE_CUSTOMER)?;
        let Some(value) = self
            .db
            .get_cf(&cf_index, keys::stripe_customer_key(stripe_customer_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        let user_id = keys::user_id_from_index_value(&value)?;
        self.patch_locked(&user_id, patch)
    }

    async fn delete_profile(&self, user_id: &UserId) -> Result<bool> {
        let _guard = self.lock()?;
        let Some(profile) = self.load(user_id)? else {
            return Ok(false);
        };

        let cf_profiles = self.cf(cf::PROFILES)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_profiles, keys::profile_key(user_id));
        if let Some(customer) = profile.stripe_customer_id.as_deref() {
            self.release_index_entry(&mut batch, customer, user_id)?;
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(true)
    }

    async fn conditional_update(
        &self,
        user_id: &UserId,
        mutation: CreditMutation,
        guard: Option<CreditGuard>,
    ) -> Result<UpdateOutcome> {
        let _guard = self.lock()?;
        let Some(before) = self.load(user_id)? else {
            return Ok(UpdateOutcome::Missing);
        };

        if guard.is_some_and(|g| !g.allows(&before)) {
            return Ok(UpdateOutcome::Rejected(before));
        }

        let mut after = before.clone();
        after
            .apply_mutation(mutation)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        self.store(Some(&before), &after)?;

        Ok(UpdateOutcome::Applied(after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meditate_core::Membership;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn profile_crud() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        store
            .insert_profile(&Profile::new(user_id.clone(), 4))
            .await
            .unwrap();
        let dup = store.insert_profile(&Profile::new(user_id.clone(), 4)).await;
        assert!(matches!(dup, Err(StoreError::AlreadyExists(_))));

        let retrieved = store.get_profile(&user_id).await.unwrap().unwrap();
        assert_eq!(retrieved.credits, 4);

        let patch = ProfilePatch {
            membership: Some(Membership::Pro),
            stripe_customer_id: Some("cus_rocks".into()),
            ..ProfilePatch::default()
        };
        store.update_profile(&user_id, &patch).await.unwrap().unwrap();

        let by_customer = store
            .update_profile_by_stripe_customer_id(
                "cus_rocks",
                &ProfilePatch {
                    credits: Some(12),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_customer.user_id, user_id);
        assert_eq!(by_customer.credits, 12);
        assert_eq!(by_customer.membership, Membership::Pro);

        assert!(store.delete_profile(&user_id).await.unwrap());
        assert!(store.get_profile(&user_id).await.unwrap().is_none());
        assert!(store
            .update_profile_by_stripe_customer_id("cus_rocks", &ProfilePatch::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn stripe_index_follows_customer_change() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let mut profile = Profile::new(user_id.clone(), 0);
        profile.stripe_customer_id = Some("cus_old".into());
        store.insert_profile(&profile).await.unwrap();

        let patch = ProfilePatch {
            stripe_customer_id: Some("cus_new".into()),
            ..ProfilePatch::default()
        };
        store.update_profile(&user_id, &patch).await.unwrap();

        assert!(store
            .update_profile_by_stripe_customer_id("cus_old", &ProfilePatch::default())
            .await
            .unwrap()
            .is_none());
        assert!(store
            .update_profile_by_stripe_customer_id("cus_new", &ProfilePatch::default())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn shared_customer_index_survives_other_profile_leaving() {
        let (store, _dir) = create_test_store();
        let first = UserId::generate();
        let second = UserId::generate();
        for user_id in [&first, &second] {
            let mut profile = Profile::new(user_id.clone(), 0);
            profile.stripe_customer_id = Some("cus_shared".into());
            store.insert_profile(&profile).await.unwrap();
        }

        // The last writer owns the index entry; moving the first profile away
        // must not drop it.
        let patch = ProfilePatch {
            stripe_customer_id: Some("cus_moved".into()),
            ..ProfilePatch::default()
        };
        store.update_profile(&first, &patch).await.unwrap().unwrap();

        let found = store
            .update_profile_by_stripe_customer_id("cus_shared", &ProfilePatch::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, second);

        let mut third = Profile::new(UserId::generate(), 0);
        third.stripe_customer_id = Some("cus_moved".into());
        store.insert_profile(&third).await.unwrap();
        assert!(store.delete_profile(&first).await.unwrap());

        let found = store
            .update_profile_by_stripe_customer_id("cus_moved", &ProfilePatch::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.user_id, third.user_id);
    }

    #[tokio::test]
    async fn guarded_debit() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        store
            .insert_profile(&Profile::new(user_id.clone(), 1))
            .await
            .unwrap();

        let first = store
            .conditional_update(&user_id, CreditMutation::debit(), Some(CreditGuard::debit()))
            .await
            .unwrap();
        assert!(matches!(first, UpdateOutcome::Applied(ref p) if p.credits == 0));

        let second = store
            .conditional_update(&user_id, CreditMutation::debit(), Some(CreditGuard::debit()))
            .await
            .unwrap();
        assert!(matches!(second, UpdateOutcome::Rejected(ref p) if p.credits == 0));

        let persisted = store.get_profile(&user_id).await.unwrap().unwrap();
        assert_eq!(persisted.total_usage_count, 1);
    }
}
