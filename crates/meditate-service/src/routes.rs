//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{credits, health, profiles};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Profiles (`x-user-id`)
/// - `POST /v1/profiles/me/bootstrap` - Get or create the caller's profile
/// - `GET /v1/profiles/me` - Get the caller's profile
/// - `DELETE /v1/profiles/me` - Delete the caller's profile
///
/// ## Credits (`x-user-id`)
/// - `GET /v1/credits` - Check balance
/// - `POST /v1/credits/deduct` - Spend one credit
///
/// ## Admin (`x-admin-key`)
/// - `POST /v1/admin/profiles` - Create a profile
/// - `PATCH /v1/admin/profiles/:user_id` - Update a profile
/// - `PATCH /v1/admin/profiles/by-stripe-customer/:customer_id` - Update by Stripe customer
/// - `POST /v1/credits/add` - Grant credits
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let profile_routes = Router::new()
        .route("/me/bootstrap", post(profiles::bootstrap))
        .route(
            "/me",
            get(profiles::get_profile).delete(profiles::delete_profile),
        );

    let credit_routes = Router::new()
        .route("/", get(credits::check_credits))
        .route("/deduct", post(credits::deduct_credit))
        .route("/add", post(credits::add_credits));

    let admin_routes = Router::new()
        .route("/profiles", post(profiles::create_profile))
        .route(
            "/profiles/by-stripe-customer/:customer_id",
            patch(profiles::update_by_stripe_customer),
        )
        .route("/profiles/:user_id", patch(profiles::update_profile));

    let api_routes = Router::new()
        .nest("/profiles", profile_routes)
        .nest("/credits", credit_routes)
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .layer(middleware::map_response(envelope_layer_rejections))
        .with_state(state)
}

/// Give the bare timeout and body-limit responses produced by the tower
/// layers an envelope body.
async fn envelope_layer_rejections(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if is_json {
        return response;
    }

    match response.status() {
        StatusCode::REQUEST_TIMEOUT => ApiError::Timeout.into_response(),
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge.into_response(),
        _ => response,
    }
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn bare_timeout_gets_envelope() {
        let bare = StatusCode::REQUEST_TIMEOUT.into_response();
        let response = envelope_layer_rejections(bare).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "timeout");
    }

    #[tokio::test]
    async fn bare_body_limit_gets_envelope() {
        let bare = (StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded").into_response();
        let response = envelope_layer_rejections(bare).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn other_responses_pass_through() {
        let response = envelope_layer_rejections(StatusCode::NO_CONTENT.into_response()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
