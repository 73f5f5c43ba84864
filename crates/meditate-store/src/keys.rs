//! Key encoding utilities for `RocksDB`.

use meditate_core::UserId;

use crate::error::{Result, StoreError};

/// Create a profile key from a user ID.
#[must_use]
pub fn profile_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a Stripe customer index key.
#[must_use]
pub fn stripe_customer_key(stripe_customer_id: &str) -> Vec<u8> {
    stripe_customer_id.as_bytes().to_vec()
}

/// Decode the user ID stored as a Stripe customer index value.
///
/// # Errors
///
/// Returns `StoreError::Serialization` if the bytes are not a valid user ID.
pub fn user_id_from_index_value(value: &[u8]) -> Result<UserId> {
    std::str::from_utf8(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?
        .parse()
        .map_err(|e: meditate_core::IdError| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_value_roundtrip() {
        let user_id = UserId::generate();
        let decoded = user_id_from_index_value(&profile_key(&user_id)).unwrap();
        assert_eq!(decoded, user_id);
    }

    #[test]
    fn index_value_rejects_garbage() {
        assert!(user_id_from_index_value(&[0xff, 0xfe]).is_err());
        assert!(user_id_from_index_value(b"").is_err());
    }
}
