//! Credit mutations and guards.
//!
//! A [`CreditMutation`] describes a delta applied to a profile's counters and a
//! [`CreditGuard`] is a predicate over the pre-update row. Stores evaluate the
//! guard and apply the mutation as one atomic step, which is what keeps the
//! balance from going negative under concurrent debits.

use serde::{Deserialize, Serialize};

use crate::Profile;

/// Credits consumed by a single debit.
pub const DEBIT_COST: i64 = 1;

/// Delta applied to a profile's counters in one atomic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMutation {
    /// Change to `credits`.
    pub credits_delta: i64,
    /// Change to `total_usage_count`.
    pub usage_delta: i64,
}

impl CreditMutation {
    /// One debit: spend [`DEBIT_COST`] credits and count one usage.
    #[must_use]
    pub const fn debit() -> Self {
        Self {
            credits_delta: -DEBIT_COST,
            usage_delta: 1,
        }
    }

    /// Add `amount` credits without touching the usage counter.
    ///
    /// The amount is not sign-checked; a negative grant lowers the balance.
    #[must_use]
    pub const fn grant(amount: i64) -> Self {
        Self {
            credits_delta: amount,
            usage_delta: 0,
        }
    }
}

/// Predicate over the pre-update row, evaluated atomically with the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditGuard {
    /// The update applies only if `credits >= min_credits`.
    pub min_credits: i64,
}

impl CreditGuard {
    /// Require at least `min_credits` before the write.
    #[must_use]
    pub const fn at_least(min_credits: i64) -> Self {
        Self { min_credits }
    }

    /// Guard for a single debit: `credits > 0`.
    #[must_use]
    pub const fn debit() -> Self {
        Self::at_least(DEBIT_COST)
    }

    /// Evaluate the guard against a row.
    #[must_use]
    pub fn allows(&self, profile: &Profile) -> bool {
        profile.credits >= self.min_credits
    }
}

/// Result of a balance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCheck {
    /// Whether at least one credit remains.
    pub has_credits: bool,
    /// Current balance.
    pub credits: i64,
}

impl From<&Profile> for CreditCheck {
    fn from(profile: &Profile) -> Self {
        Self {
            has_credits: profile.has_credits(),
            credits: profile.credits,
        }
    }
}

/// A mutation would overflow a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("credit counter overflow")]
pub struct CreditOverflow;
