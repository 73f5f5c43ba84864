//! Profile types.
//!
//! A profile is the single persisted record per identity. The ledger only cares
//! about `credits` and `total_usage_count`; the remaining fields are billing
//! attributes that are passed through untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credits::{CreditMutation, CreditOverflow};
use crate::error::{LedgerError, Result};
use crate::UserId;

/// A user profile holding the credit balance and usage counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// The user ID (from the identity provider).
    pub user_id: UserId,

    /// Membership tier.
    pub membership: Membership,

    /// Stripe customer ID, set by the billing integration.
    pub stripe_customer_id: Option<String>,

    /// Stripe subscription ID, set by the billing integration.
    pub stripe_subscription_id: Option<String>,

    /// Remaining credits. Never negative after a debit.
    pub credits: i64,

    /// Number of completed debits over the profile's lifetime.
    pub total_usage_count: i64,

    /// When the profile was created.
    pub created_at: DateTime<Utc>,

    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Create a new free-tier profile with the given starting balance.
    #[must_use]
    pub fn new(user_id: UserId, credits: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            membership: Membership::Free,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            credits,
            total_usage_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a profile from an insert request.
    #[must_use]
    pub fn from_new(new: NewProfile, default_credits: i64) -> Self {
        let mut profile = Self::new(new.user_id, new.credits.unwrap_or(default_credits));
        profile.membership = new.membership.unwrap_or_default();
        profile.stripe_customer_id = new.stripe_customer_id;
        profile.stripe_subscription_id = new.stripe_subscription_id;
        profile
    }

    /// Whether at least one credit remains.
    #[must_use]
    pub fn has_credits(&self) -> bool {
        self.credits > 0
    }

    /// Apply a credit mutation in place.
    ///
    /// # Errors
    ///
    /// Returns `CreditOverflow` if either counter would overflow; the profile is
    /// left unchanged in that case.
    pub fn apply_mutation(
        &mut self,
        mutation: CreditMutation,
    ) -> std::result::Result<(), CreditOverflow> {
        let credits = self
            .credits
            .checked_add(mutation.credits_delta)
            .ok_or(CreditOverflow)?;
        let usage = self
            .total_usage_count
            .checked_add(mutation.usage_delta)
            .ok_or(CreditOverflow)?;

        self.credits = credits;
        self.total_usage_count = usage;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Apply a partial update in place.
    pub fn apply_patch(&mut self, patch: &ProfilePatch) {
        if let Some(membership) = patch.membership {
            self.membership = membership;
        }
        if let Some(id) = &patch.stripe_customer_id {
            self.stripe_customer_id = Some(id.clone());
        }
        if let Some(id) = &patch.stripe_subscription_id {
            self.stripe_subscription_id = Some(id.clone());
        }
        if let Some(credits) = patch.credits {
            self.credits = credits;
        }
        self.updated_at = Utc::now();
    }
}

/// Membership tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    /// Free tier.
    #[default]
    Free,

    /// Paid tier.
    Pro,
}

impl Membership {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Membership {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            other => Err(LedgerError::InvalidInput(format!(
                "unknown membership: {other}"
            ))),
        }
    }
}

/// Insert request for a new profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    /// The user ID.
    pub user_id: UserId,

    /// Membership tier (default: free).
    #[serde(default)]
    pub membership: Option<Membership>,

    /// Stripe customer ID.
    #[serde(default)]
    pub stripe_customer_id: Option<String>,

    /// Stripe subscription ID.
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,

    /// Starting balance (default: configured default credits).
    #[serde(default)]
    pub credits: Option<i64>,
}

impl NewProfile {
    /// Insert request with every optional field left to its default.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            membership: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            credits: None,
        }
    }

    /// Reject a negative starting balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidInput` if `credits` is negative.
    pub fn validate(&self) -> Result<()> {
        validate_credits(self.credits)
    }
}

/// Partial update of a profile. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    /// New membership tier.
    #[serde(default)]
    pub membership: Option<Membership>,

    /// New Stripe customer ID.
    #[serde(default)]
    pub stripe_customer_id: Option<String>,

    /// New Stripe subscription ID.
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,

    /// Overwrite the balance (billing integrations only).
    #[serde(default)]
    pub credits: Option<i64>,
}

impl ProfilePatch {
    /// Reject a patch that would set a negative balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidInput` if `credits` is negative.
    pub fn validate(&self) -> Result<()> {
        validate_credits(self.credits)
    }
}

fn validate_credits(credits: Option<i64>) -> Result<()> {
    match credits {
        Some(c) if c < 0 => Err(LedgerError::InvalidInput(format!(
            "credits must not be negative: {c}"
        ))),
        _ => Ok(()),
    }
}
