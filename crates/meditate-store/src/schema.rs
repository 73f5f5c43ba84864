//! Column families used by the `RocksDB` backend.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary profile records, keyed by `user_id`.
    pub const PROFILES: &str = "profiles";

    /// Index: Stripe customer ID to `user_id`.
    pub const PROFILES_BY_STRIPE_CUSTOMER: &str = "profiles_by_stripe_customer";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::PROFILES, cf::PROFILES_BY_STRIPE_CUSTOMER]
}
