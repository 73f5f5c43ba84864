//! Conversion of ledger errors into failed result envelopes.
//!
//! This is the single place where an error stops being an error: it is logged
//! at a level matching its kind and turned into an [`ActionState`].

use meditate_core::{ActionState, LedgerError};

/// Message for a missing profile.
pub const PROFILE_NOT_FOUND: &str = "Profile not found";

/// Message for a refused debit.
pub const INSUFFICIENT_CREDITS: &str = "Insufficient credits";

/// Log `err` and build the failed envelope for `operation`.
///
/// `storage_message` is shown for storage failures, whose details stay in the
/// log rather than reaching the caller.
pub fn failure<T>(
    operation: &'static str,
    subject: &str,
    err: &LedgerError,
    storage_message: &str,
) -> ActionState<T> {
    let message = match err {
        LedgerError::NotFound { .. } => {
            tracing::debug!(operation, subject, "Profile not found");
            PROFILE_NOT_FOUND.to_string()
        }
        LedgerError::InsufficientCredits { balance } => {
            tracing::info!(operation, subject, balance = %balance, "Debit refused");
            INSUFFICIENT_CREDITS.to_string()
        }
        LedgerError::AlreadyExists { .. } => {
            tracing::info!(operation, subject, "Profile already exists");
            "Profile already exists".to_string()
        }
        LedgerError::InvalidInput(_) | LedgerError::InvalidId(_) => {
            tracing::warn!(operation, subject, error = %err, "Rejected invalid input");
            err.to_string()
        }
        LedgerError::StorageFailure(_) => {
            tracing::error!(operation, subject, error = %err, "Storage failure");
            storage_message.to_string()
        }
    };

    ActionState::from_error(err, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meditate_core::FailureKind;

    #[test]
    fn storage_details_are_not_exposed() {
        let err = LedgerError::StorageFailure("password authentication failed".into());
        let state: ActionState<()> = failure("test", "user_1", &err, "Failed to deduct credit");
        assert!(!state.success);
        assert_eq!(state.message, "Failed to deduct credit");
        assert_eq!(state.code, Some(FailureKind::StorageFailure));
    }

    #[test]
    fn refusals_use_fixed_messages() {
        let state: ActionState<()> = failure(
            "test",
            "user_1",
            &LedgerError::InsufficientCredits { balance: 0 },
            "unused",
        );
        assert_eq!(state.message, INSUFFICIENT_CREDITS);

        let state: ActionState<()> =
            failure("test", "user_1", &LedgerError::not_found("user_1"), "unused");
        assert_eq!(state.message, PROFILE_NOT_FOUND);
        assert_eq!(state.code, Some(FailureKind::NotFound));
    }
}
