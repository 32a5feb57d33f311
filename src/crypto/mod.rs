//! Cryptographic primitives for the vault.
//!
//! This module provides:
//! - PBKDF2-HMAC-SHA512 key derivation for the vault encryption key
//! - bcrypt hashing for master-password authentication
//! - AES-256-GCM encryption/decryption
//! - Zeroization of key material

pub mod cipher;
pub mod kdf;
pub mod password;

pub use cipher::{decrypt_blob, encrypt_blob, EncryptedBlob};
pub use kdf::{derive_key, DerivedKey, EncryptionSalt};
pub use password::{hash_password, verify_password, PasswordHashRecord};

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KdfFailed(String),

    #[error("Password hashing failed: {0}")]
    HashFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Authentication failed - data may have been tampered with")]
    AuthenticationFailed,

    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
