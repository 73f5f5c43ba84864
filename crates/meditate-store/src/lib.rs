//! Storage layer for meditate profiles.
//!
//! The [`ProfileStore`] trait is the only way the ledger touches persisted
//! state. Every backend must evaluate a [`CreditGuard`] and apply a
//! [`CreditMutation`] as one atomic step; that is what keeps concurrent debits
//! from driving a balance negative.
//!
//! # Backends
//!
//! - [`MemoryStore`]: `RwLock<HashMap>`; used by tests and the `memory` backend
//! - [`PgStore`]: PostgreSQL via `sqlx`, single-statement conditional updates
//! - `RocksStore`: `RocksDB` with CBOR values (feature `rocksdb-backend`)
//!
//! # Example
//!
//! ```
//! use meditate_core::{CreditGuard, CreditMutation, NewProfile, Profile, UserId};
//! use meditate_store::{MemoryStore, ProfileStore, UpdateOutcome};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//! store.insert_profile(&Profile::new(user_id.clone(), 1)).await.unwrap();
//!
//! let outcome = store
//!     .conditional_update(&user_id, CreditMutation::debit(), Some(CreditGuard::debit()))
//!     .await
//!     .unwrap();
//! assert!(matches!(outcome, UpdateOutcome::Applied(p) if p.credits == 0));
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;
use meditate_core::{CreditGuard, CreditMutation, Profile, ProfilePatch, UserId};

/// Outcome of a [`ProfileStore::conditional_update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The guard held and the mutation was applied. Carries the updated row.
    Applied(Profile),

    /// The guard did not hold. Carries the row as observed; nothing was written.
    Rejected(Profile),

    /// No profile exists for the identifier.
    Missing,
}

/// The storage trait defining all profile operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (PostgreSQL, `RocksDB`, in-memory for testing).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if a profile exists for the user.
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile>;

    /// Get a profile by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>>;

    /// Apply a partial update. Returns `None` if no profile exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>>;

    /// Apply a partial update to the profile linked to a Stripe customer.
    /// Returns `None` if no profile carries that customer ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn update_profile_by_stripe_customer_id(
        &self,
        stripe_customer_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>>;

    /// Delete a profile. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn delete_profile(&self, user_id: &UserId) -> Result<bool>;

    /// Atomically apply `mutation` if `guard` holds on the pre-update row.
    ///
    /// Guard evaluation and write happen as one step with respect to every
    /// other writer of the same row.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the write lost a race and may be retried,
    /// or another error if the database operation fails or a counter overflows.
    async fn conditional_update(
        &self,
        user_id: &UserId,
        mutation: CreditMutation,
        guard: Option<CreditGuard>,
    ) -> Result<UpdateOutcome>;
}
