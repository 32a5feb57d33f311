//! Encrypted vault core for a local password/TOTP manager.
//!
//! This library provides the vault's cryptographic operations, the encrypted
//! record store, session lifecycle (lock/unlock, rate limiting, idle
//! auto-lock), RFC 6238 TOTP support, and multi-format import/export.

pub mod audit;
pub mod autolock;
pub mod crypto;
pub mod formats;
pub mod import_export;
pub mod lockout;
pub mod session;
pub mod store;
pub mod totp;

pub use audit::{audit_passwords, PasswordAuditReport, PasswordStrength};
pub use crypto::cipher::EncryptedBlob;
pub use crypto::kdf::{derive_key, DerivedKey, EncryptionSalt};
pub use crypto::password::{hash_password, verify_password, PasswordHashRecord};
pub use crypto::CryptoError;
pub use formats::ImportFormat;
pub use import_export::{ExportFormat, ImportReport};
pub use session::{SessionConfig, SessionEvent, SessionManager, UnlockOutcome};
pub use store::models::{Category, PasswordEntry, TotpEntry, VaultRecord};
pub use store::{ConfigStore, VaultStore};
pub use totp::{
    current_code, generate_totp_code, parse_otpauth_uri, seconds_remaining, ParsedTotpUri, TotpCode,
};

use thiserror::Error;

/// Result type for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// General error type for vault operations
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Vault is locked")]
    VaultLocked,

    #[error("Vault is not set up")]
    NotInitialized,

    #[error("Vault is already set up")]
    AlreadyInitialized,

    #[error("Invalid master password")]
    InvalidPassword,

    #[error("Too many failed attempts, retry in {remaining_seconds}s")]
    RateLimited { remaining_seconds: u64 },

    #[error("Stored configuration is corrupt: {0}")]
    CorruptConfig(String),

    #[error("Vault data is corrupt and recovery was already attempted")]
    PersistentCorruption,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Decryption failed - wrong password or corrupted data")]
    Decryption,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
