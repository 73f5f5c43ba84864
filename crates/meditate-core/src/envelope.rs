//! The result envelope returned by every ledger and profile action.

use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, LedgerError};

/// Uniform `{success, message, data?}` result.
///
/// Success and failure travel through the same shape. Callers branch on
/// `success` and must not assume `data` is present when it is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState<T> {
    /// Whether the action succeeded.
    pub success: bool,

    /// Human-readable outcome.
    pub message: String,

    /// Payload, present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Failure classification, present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<FailureKind>,
}

impl<T> ActionState<T> {
    /// A successful outcome carrying `data`.
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            code: None,
        }
    }

    /// A failed outcome.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            code: Some(kind),
        }
    }

    /// A failed outcome classified from a ledger error.
    pub fn from_error(err: &LedgerError, message: impl Into<String>) -> Self {
        Self::failure(err.kind(), message)
    }

    /// Consume the envelope, returning the payload on success.
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape() {
        let state = ActionState::success("Credits checked successfully", 4_i64);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "message": "Credits checked successfully",
                "data": 4
            })
        );
    }

    #[test]
    fn failure_shape_omits_data() {
        let state: ActionState<i64> =
            ActionState::failure(FailureKind::NotFound, "Profile not found");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "message": "Profile not found",
                "code": "not_found"
            })
        );
        assert_eq!(state.into_data(), None);
    }
}
