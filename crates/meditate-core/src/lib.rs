//! Core types for the meditate credit ledger.
//!
//! This crate provides the foundational types shared by the store and service:
//!
//! - **Identifiers**: `UserId`
//! - **Profiles**: `Profile`, `Membership`, `NewProfile`, `ProfilePatch`
//! - **Credits**: `CreditMutation`, `CreditGuard`, `CreditCheck`
//! - **Results**: `ActionState`, `LedgerError`, `FailureKind`
//!
//! # Credit Unit
//!
//! One credit pays for one debit (one generated session). Balances are `i64`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod credits;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod profile;

pub use credits::{CreditCheck, CreditGuard, CreditMutation, CreditOverflow, DEBIT_COST};
pub use envelope::ActionState;
pub use error::{FailureKind, LedgerError, Result};
pub use ids::{IdError, UserId, MAX_USER_ID_LEN};
pub use profile::{Membership, NewProfile, Profile, ProfilePatch};
