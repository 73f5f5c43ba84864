//! API error types and responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use meditate_core::{ActionState, FailureKind};

/// Request rejected before it reached a ledger or profile action.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid caller identity.
    #[error("unauthorized")]
    Unauthorized,

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body over the configured limit.
    #[error("request body too large")]
    PayloadTooLarge,

    /// Request did not finish within the configured timeout.
    #[error("request timed out")]
    Timeout,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "invalid_input"),
            Self::Timeout => (StatusCode::REQUEST_TIMEOUT, "timeout"),
        };

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}

/// Envelope-shaped body for rejected requests.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    code: &'static str,
}

/// An [`ActionState`] sent as JSON with a status derived from its failure kind.
#[derive(Debug)]
pub struct ActionResponse<T>(pub ActionState<T>);

impl<T> From<ActionState<T>> for ActionResponse<T> {
    fn from(state: ActionState<T>) -> Self {
        Self(state)
    }
}

impl<T: Serialize> IntoResponse for ActionResponse<T> {
    fn into_response(self) -> Response {
        let status = self.0.code.map_or(StatusCode::OK, status_for);
        (status, Json(self.0)).into_response()
    }
}

/// HTTP status for a failed action.
#[must_use]
pub const fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::AlreadyExists => StatusCode::CONFLICT,
        FailureKind::InsufficientCredits => StatusCode::PAYMENT_REQUIRED,
        FailureKind::InvalidInput => StatusCode::BAD_REQUEST,
        FailureKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_ok() {
        let response = ActionResponse(ActionState::success("done", 1)).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn failures_map_to_status() {
        let response = ActionResponse::<()>(ActionState::failure(
            FailureKind::InsufficientCredits,
            "Insufficient credits",
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        assert_eq!(status_for(FailureKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(FailureKind::StorageFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn layer_rejections() {
        assert_eq!(
            ApiError::Timeout.into_response().status(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ApiError::PayloadTooLarge.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
