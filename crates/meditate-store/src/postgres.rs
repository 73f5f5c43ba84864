//! PostgreSQL storage implementation.
//!
//! Conditional updates are a single `UPDATE ... WHERE credits >= $min RETURNING`
//! statement, so the guard is evaluated under the row lock taken by the write.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use meditate_core::{CreditGuard, CreditMutation, Membership, Profile, ProfilePatch, UserId};

use crate::error::{Result, StoreError};
use crate::{ProfileStore, UpdateOutcome};

/// PostgreSQL-backed profile store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        tracing::info!(max_connections, "Creating database connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    /// Run embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    fn row_to_profile(row: &PgRow) -> Result<Profile> {
        let user_id: String = row.try_get("user_id")?;
        let membership: String = row.try_get("membership")?;

        Ok(Profile {
            user_id: user_id
                .parse::<UserId>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            membership: membership
                .parse::<Membership>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            stripe_customer_id: row.try_get("stripe_customer_id")?,
            stripe_subscription_id: row.try_get("stripe_subscription_id")?,
            credits: row.try_get("credits")?,
            total_usage_count: row.try_get("total_usage_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        let row = sqlx::query(
            r"
            INSERT INTO profiles (user_id, membership, stripe_customer_id, stripe_subscription_id,
                                  credits, total_usage_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING user_id, membership, stripe_customer_id, stripe_subscription_id,
                      credits, total_usage_count, created_at, updated_at
            ",
        )
        .bind(profile.user_id.as_str())
        .bind(profile.membership.as_str())
        .bind(profile.stripe_customer_id.as_deref())
        .bind(profile.stripe_subscription_id.as_deref())
        .bind(profile.credits)
        .bind(profile.total_usage_count)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::AlreadyExists(_) => StoreError::AlreadyExists(profile.user_id.to_string()),
            other => other,
        })?;

        Self::row_to_profile(&row)
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        sqlx::query(
            r"
            SELECT user_id, membership, stripe_customer_id, stripe_subscription_id,
                   credits, total_usage_count, created_at, updated_at
            FROM profiles
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(|row| Self::row_to_profile(&row))
        .transpose()
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        sqlx::query(
            r"
            UPDATE profiles
            SET membership = COALESCE($2, membership),
                stripe_customer_id = COALESCE($3, stripe_customer_id),
                stripe_subscription_id = COALESCE($4, stripe_subscription_id),
                credits = COALESCE($5, credits),
                updated_at = now()
            WHERE user_id = $1
            RETURNING user_id, membership, stripe_customer_id, stripe_subscription_id,
                      credits, total_usage_count, created_at, updated_at
            ",
        )
        .bind(user_id.as_str())
        .bind(patch.membership.map(|m| m.as_str()))
        .bind(patch.stripe_customer_id.as_deref())
        .bind(patch.stripe_subscription_id.as_deref())
        .bind(patch.credits)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| Self::row_to_profile(&row))
        .transpose()
    }

    async fn update_profile_by_stripe_customer_id(
        &self,
        stripe_customer_id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        sqlx::query(
            r"
            UPDATE profiles
            SET membership = COALESCE($2, membership),
                stripe_customer_id = COALESCE($3, stripe_customer_id),
                stripe_subscription_id = COALESCE($4, stripe_subscription_id),
                credits = COALESCE($5, credits),
                updated_at = now()
            WHERE stripe_customer_id = $1
            RETURNING user_id, membership, stripe_customer_id, stripe_subscription_id,
                      credits, total_usage_count, created_at, updated_at
            ",
        )
        .bind(stripe_customer_id)
        .bind(patch.membership.map(|m| m.as_str()))
        .bind(patch.stripe_customer_id.as_deref())
        .bind(patch.stripe_subscription_id.as_deref())
        .bind(patch.credits)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| Self::row_to_profile(&row))
        .transpose()
    }

    async fn delete_profile(&self, user_id: &UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn conditional_update(
        &self,
        user_id: &UserId,
        mutation: CreditMutation,
        guard: Option<CreditGuard>,
    ) -> Result<UpdateOutcome> {
        let row = sqlx::query(
            r"
            UPDATE profiles
            SET credits = credits + $2,
                total_usage_count = total_usage_count + $3,
                updated_at = now()
            WHERE user_id = $1
              AND ($4::BIGINT IS NULL OR credits >= $4)
            RETURNING user_id, membership, stripe_customer_id, stripe_subscription_id,
                      credits, total_usage_count, created_at, updated_at
            ",
        )
        .bind(user_id.as_str())
        .bind(mutation.credits_delta)
        .bind(mutation.usage_delta)
        .bind(guard.map(|g| g.min_credits))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(UpdateOutcome::Applied(Self::row_to_profile(&row)?));
        }
        if guard.is_none() {
            return Ok(UpdateOutcome::Missing);
        }

        // Zero rows: either the guard failed or the row is absent.
        Ok(match self.get_profile(user_id).await? {
            Some(profile) => UpdateOutcome::Rejected(profile),
            None => UpdateOutcome::Missing,
        })
    }
}
