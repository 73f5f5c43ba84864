//! Meditate credit ledger HTTP API service.
//!
//! This crate provides:
//!
//! - The credit ledger: check, deduct one credit, add credits
//! - Profile actions: create, read, update, delete, login bootstrap
//! - An Axum router exposing both over JSON
//!
//! Every action answers with an [`ActionState`](meditate_core::ActionState)
//! envelope; store errors never escape an action.
//!
//! # Authentication
//!
//! 1. **`x-user-id` header** - the end user, as asserted by the fronting
//!    identity provider
//! 2. **`x-admin-key` header** - billing integrations and operators

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Handlers and actions report failures through the envelope, not Result.
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod ledger;
pub mod outcome;
pub mod profiles;
pub mod retry;
pub mod routes;
pub mod state;

pub use config::{ServiceConfig, StorageBackend};
pub use error::{ActionResponse, ApiError};
pub use extract::ApiJson;
pub use ledger::CreditLedger;
pub use profiles::ProfileService;
pub use retry::RetryPolicy;
pub use routes::create_router;
pub use state::AppState;
