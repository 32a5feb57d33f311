//! PBKDF2-HMAC-SHA512 key derivation for the vault encryption key.
//!
//! Parameters are fixed for the life of a vault:
//! - 100,000 iterations
//! - 32-byte salt, generated once at setup and reused for every derivation
//! - 32-byte output key

use crate::crypto::{CryptoError, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of PBKDF2 iterations. Deliberately slow.
pub const KDF_ITERATIONS: u32 = 100_000;

/// Salt length in bytes.
pub const SALT_LEN: usize = 32;

/// The random salt mixed into every key derivation.
///
/// Generated once at first setup and persisted (hex) in the plaintext config
/// store. Regenerated only during one-shot corruption recovery, after which
/// all previously encrypted data is permanently unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionSalt([u8; SALT_LEN]);

impl EncryptionSalt {
    /// Generate a fresh random salt.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a salt from its hex representation in the config store.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CryptoError::KdfFailed(format!("Invalid salt hex: {}", e)))?;
        let arr: [u8; SALT_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: SALT_LEN,
                got: s.len() / 2,
            })?;
        Ok(Self(arr))
    }
}

/// The symmetric vault key derived from the master password.
///
/// Exists only in memory. Created on unlock, zeroized when dropped on lock.
#[derive(Clone, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes (use sparingly)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time: key comparison must not leak via timing.
        self.key.ct_eq(&other.key).into()
    }
}

impl Eq for DerivedKey {}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derive the vault encryption key from the master password.
///
/// Deterministic: the same (password, salt) pair always yields the same key.
/// Runs in time independent of the password's content.
pub fn derive_key(password: &str, salt: &EncryptionSalt) -> DerivedKey {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), KDF_ITERATIONS, &mut out);
    let key = DerivedKey::from_bytes(out);
    out.zeroize();
    key
}
