//! Master-password authentication hashing.
//!
//! Uses bcrypt (cost 12) with a per-call random salt. The verification hash
//! is deliberately distinct from the encryption key derivation in `kdf`; it
//! is persisted in the plaintext config store and must never double as key
//! material.

use crate::crypto::{CryptoError, Result};
use serde::{Deserialize, Serialize};

/// Default bcrypt cost factor.
pub const BCRYPT_COST: u32 = 12;

/// The persisted authentication record for the master password.
///
/// Exactly one record exists per vault; absence means the vault is
/// uninitialized. The bcrypt modular-crypt string embeds its own salt and
/// cost parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordHashRecord {
    pub hash: String,
}

impl PasswordHashRecord {
    pub fn new(hash: String) -> Self {
        Self { hash }
    }
}

/// Hash the master password for authentication.
pub fn hash_password(password: &str, cost: u32) -> Result<PasswordHashRecord> {
    let hash = bcrypt::hash(password, cost)
        .map_err(|e| CryptoError::HashFailed(e.to_string()))?;
    Ok(PasswordHashRecord::new(hash))
}

/// Verify the master password against the stored record.
///
/// bcrypt's comparison is constant-time with respect to the hash contents.
/// A malformed stored record is a config-integrity failure, not a wrong
/// password.
pub fn verify_password(password: &str, record: &PasswordHashRecord) -> Result<bool> {
    bcrypt::verify(password, &record.hash)
        .map_err(|e| CryptoError::HashFailed(format!("Malformed password record: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps the test suite fast; production uses BCRYPT_COST.
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify() {
        let record = hash_password("correct horse", TEST_COST).unwrap();
        assert!(verify_password("correct horse", &record).unwrap());
        assert!(!verify_password("wrong horse", &record).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let r1 = hash_password("same password", TEST_COST).unwrap();
        let r2 = hash_password("same password", TEST_COST).unwrap();
        assert_ne!(r1.hash, r2.hash);
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        let record = PasswordHashRecord::new("not-a-bcrypt-hash".to_string());
        assert!(verify_password("anything", &record).is_err());
    }
}
