//! Error types for ledger and profile operations.

use serde::{Deserialize, Serialize};

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger and profile operations.
///
/// All variants are recoverable; callers see them through the
/// [`ActionState`](crate::ActionState) envelope rather than as a propagated error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// No profile exists for the identifier.
    #[error("profile not found: {user_id}")]
    NotFound {
        /// The identifier that was looked up.
        user_id: String,
    },

    /// A profile already exists for the identifier.
    #[error("profile already exists: {user_id}")]
    AlreadyExists {
        /// The identifier that collided.
        user_id: String,
    },

    /// The debit was refused; the balance is unchanged.
    #[error("insufficient credits: balance={balance}")]
    InsufficientCredits {
        /// Balance observed when the debit was refused.
        balance: i64,
    },

    /// The request was malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The store failed or kept conflicting past the retry budget.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::NotFound`].
    pub fn not_found(user_id: impl ToString) -> Self {
        Self::NotFound {
            user_id: user_id.to_string(),
        }
    }

    /// Coarse classification reported in the result envelope.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::AlreadyExists { .. } => FailureKind::AlreadyExists,
            Self::InsufficientCredits { .. } => FailureKind::InsufficientCredits,
            Self::InvalidInput(_) | Self::InvalidId(_) => FailureKind::InvalidInput,
            Self::StorageFailure(_) => FailureKind::StorageFailure,
        }
    }
}

/// Failure classification carried by a failed [`ActionState`](crate::ActionState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No profile for the identifier.
    NotFound,
    /// Profile already exists.
    AlreadyExists,
    /// Debit refused.
    InsufficientCredits,
    /// Malformed request.
    InvalidInput,
    /// Transport or database error.
    StorageFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(LedgerError::not_found("u").kind(), FailureKind::NotFound);
        assert_eq!(
            LedgerError::InsufficientCredits { balance: 0 }.kind(),
            FailureKind::InsufficientCredits
        );
        assert_eq!(
            LedgerError::from(IdError::Empty).kind(),
            FailureKind::InvalidInput
        );
        assert_eq!(
            LedgerError::StorageFailure("down".into()).kind(),
            FailureKind::StorageFailure
        );
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::InsufficientCredits).unwrap();
        assert_eq!(json, "\"insufficient_credits\"");
    }
}
