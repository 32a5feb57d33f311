//! Plaintext configuration store.
//!
//! Holds the small amount of unencrypted state the vault needs before a key
//! exists: the master-password hash record, the encryption salt, and the
//! one-shot corruption-recovery flag.

use crate::crypto::kdf::EncryptionSalt;
use crate::crypto::password::PasswordHashRecord;
use crate::{Result, VaultError};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

const KEY_PASSWORD_HASH: &str = "password_hash";
const KEY_ENCRYPTION_SALT: &str = "encryption_salt";
const KEY_RECOVERY_ATTEMPTED: &str = "vault_recovery_attempted";

/// Key/value store for unencrypted app configuration.
pub struct ConfigStore {
    conn: Connection,
}

impl ConfigStore {
    /// Open (or create) the config store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| VaultError::Database(e.to_string()))?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory config store for testing.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| VaultError::Database(e.to_string()))?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS config (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
                [],
            )
            .map_err(|e| VaultError::Database(e.to_string()))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM config WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| VaultError::Database(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO config (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )
            .map_err(|e| VaultError::Database(e.to_string()))?;
        Ok(())
    }

    /// The stored master-password hash record, if the vault is set up.
    pub fn password_record(&self) -> Result<Option<PasswordHashRecord>> {
        Ok(self.get(KEY_PASSWORD_HASH)?.map(PasswordHashRecord::new))
    }

    pub fn set_password_record(&self, record: &PasswordHashRecord) -> Result<()> {
        self.set(KEY_PASSWORD_HASH, &record.hash)
    }

    /// The persisted encryption salt. A stored but unparseable salt is a
    /// config-integrity failure.
    pub fn encryption_salt(&self) -> Result<Option<EncryptionSalt>> {
        match self.get(KEY_ENCRYPTION_SALT)? {
            Some(hex) => EncryptionSalt::from_hex(&hex)
                .map(Some)
                .map_err(|e| VaultError::CorruptConfig(e.to_string())),
            None => Ok(None),
        }
    }

    pub fn set_encryption_salt(&self, salt: &EncryptionSalt) -> Result<()> {
        self.set(KEY_ENCRYPTION_SALT, &salt.to_hex())
    }

    /// Whether one-shot corruption recovery has already run for this vault.
    pub fn recovery_attempted(&self) -> Result<bool> {
        Ok(self.get(KEY_RECOVERY_ATTEMPTED)?.as_deref() == Some("true"))
    }

    pub fn set_recovery_attempted(&self, attempted: bool) -> Result<()> {
        self.set(
            KEY_RECOVERY_ATTEMPTED,
            if attempted { "true" } else { "false" },
        )
    }

    /// Whether the vault has been initialized with a master password.
    pub fn is_setup(&self) -> Result<bool> {
        Ok(self.password_record()?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_store_is_empty() {
        let store = ConfigStore::in_memory().unwrap();
        assert!(!store.is_setup().unwrap());
        assert!(store.password_record().unwrap().is_none());
        assert!(store.encryption_salt().unwrap().is_none());
        assert!(!store.recovery_attempted().unwrap());
    }

    #[test]
    fn test_password_record_roundtrip() {
        let store = ConfigStore::in_memory().unwrap();
        let record = PasswordHashRecord::new("$2b$12$fakefakefakefake".to_string());
        store.set_password_record(&record).unwrap();
        assert_eq!(store.password_record().unwrap(), Some(record));
        assert!(store.is_setup().unwrap());
    }

    #[test]
    fn test_salt_roundtrip() {
        let store = ConfigStore::in_memory().unwrap();
        let salt = EncryptionSalt::generate();
        store.set_encryption_salt(&salt).unwrap();
        assert_eq!(store.encryption_salt().unwrap(), Some(salt));
    }

    #[test]
    fn test_corrupt_salt_is_reported() {
        let store = ConfigStore::in_memory().unwrap();
        store.set(KEY_ENCRYPTION_SALT, "zz-not-hex").unwrap();
        assert!(matches!(
            store.encryption_salt(),
            Err(VaultError::CorruptConfig(_))
        ));
    }

    #[test]
    fn test_recovery_flag() {
        let store = ConfigStore::in_memory().unwrap();
        store.set_recovery_attempted(true).unwrap();
        assert!(store.recovery_attempted().unwrap());
    }
}
