//! Encrypted vault store.
//!
//! The authoritative record store: password entries, TOTP entries, and
//! categories, each collection serialized as JSON and encrypted as a single
//! AES-256-GCM blob in SQLite. Decryption failure at open time is the
//! corruption signal the session layer's one-shot recovery protocol keys on.

pub mod config;
pub mod models;

pub use config::ConfigStore;

use crate::crypto::cipher::{decrypt_blob, encrypt_blob, EncryptedBlob};
use crate::crypto::kdf::DerivedKey;
use crate::store::models::{Category, PasswordEntry, TotpEntry, VaultRecord};
use crate::{Result, VaultError};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

const COLLECTION_PASSWORDS: &str = "passwords";
const COLLECTION_TOTP: &str = "totp";
const COLLECTION_CATEGORIES: &str = "categories";

/// Decrypted in-memory image of the vault collections.
#[derive(Debug, Default, Clone)]
struct VaultData {
    passwords: Vec<PasswordEntry>,
    totp: Vec<TotpEntry>,
    categories: Vec<Category>,
}

/// The encrypted key/value record store.
///
/// Exists only while the session is unlocked; the session manager drops it
/// (and the key with it) on lock.
pub struct VaultStore {
    conn: Connection,
    key: DerivedKey,
    data: VaultData,
}

impl VaultStore {
    /// Initialize a fresh vault store with empty collections.
    pub fn initialize<P: AsRef<Path>>(path: P, key: DerivedKey) -> Result<Self> {
        let conn = Self::open_conn(path)?;
        let mut store = Self {
            conn,
            key,
            data: VaultData::default(),
        };
        store.persist_all()?;
        info!("Initialized empty vault store");
        Ok(store)
    }

    /// Open an existing vault store, decrypting every collection.
    ///
    /// Any authentication failure while decrypting surfaces as an error; the
    /// caller decides whether that means recovery or fatal corruption.
    pub fn open<P: AsRef<Path>>(path: P, key: DerivedKey) -> Result<Self> {
        let conn = Self::open_conn(path)?;
        let data = VaultData {
            passwords: Self::load_collection(&conn, &key, COLLECTION_PASSWORDS)?,
            totp: Self::load_collection(&conn, &key, COLLECTION_TOTP)?,
            categories: Self::load_collection(&conn, &key, COLLECTION_CATEGORIES)?,
        };
        Ok(Self { conn, key, data })
    }

    fn open_conn<P: AsRef<Path>>(path: P) -> Result<Connection> {
        let conn = Connection::open(path).map_err(|e| VaultError::Database(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                blob TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| VaultError::Database(e.to_string()))?;
        Ok(conn)
    }

    fn load_collection<T: serde::de::DeserializeOwned>(
        conn: &Connection,
        key: &DerivedKey,
        name: &str,
    ) -> Result<Vec<T>> {
        let blob_json: Option<String> = conn
            .query_row(
                "SELECT blob FROM collections WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| VaultError::Database(e.to_string()))?;

        let Some(blob_json) = blob_json else {
            // Missing row is a fresh store, not corruption.
            return Ok(Vec::new());
        };

        let blob: EncryptedBlob = serde_json::from_str(&blob_json)
            .map_err(|e| VaultError::Database(format!("Malformed collection blob: {}", e)))?;
        let plaintext = decrypt_blob(key, &blob)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::Database(format!("Malformed collection payload: {}", e)))
    }

    fn encode_collection<T: serde::Serialize>(key: &DerivedKey, items: &[T]) -> Result<String> {
        let plaintext = serde_json::to_vec(items)
            .map_err(|e| VaultError::Database(format!("Serialization failed: {}", e)))?;
        let blob = encrypt_blob(key, &plaintext)?;
        serde_json::to_string(&blob)
            .map_err(|e| VaultError::Database(format!("Serialization failed: {}", e)))
    }

    /// Re-encrypt and write the named collections in one transaction.
    fn persist(&mut self, names: &[&str]) -> Result<()> {
        let mut rows = Vec::with_capacity(names.len());
        for &name in names {
            let blob_json = match name {
                COLLECTION_PASSWORDS => Self::encode_collection(&self.key, &self.data.passwords)?,
                COLLECTION_TOTP => Self::encode_collection(&self.key, &self.data.totp)?,
                COLLECTION_CATEGORIES => Self::encode_collection(&self.key, &self.data.categories)?,
                other => return Err(VaultError::Database(format!("Unknown collection: {}", other))),
            };
            rows.push((name, blob_json));
        }

        let tx = self
            .conn
            .transaction()
            .map_err(|e| VaultError::Database(e.to_string()))?;
        for (name, blob_json) in rows {
            tx.execute(
                "INSERT INTO collections (name, blob) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET blob = excluded.blob",
                [name, blob_json.as_str()],
            )
            .map_err(|e| VaultError::Database(e.to_string()))?;
        }
        tx.commit().map_err(|e| VaultError::Database(e.to_string()))
    }

    fn persist_all(&mut self) -> Result<()> {
        self.persist(&[COLLECTION_PASSWORDS, COLLECTION_TOTP, COLLECTION_CATEGORIES])
    }

    /// Re-encrypt every collection under a new key, atomically.
    pub fn rekey(&mut self, new_key: DerivedKey) -> Result<()> {
        self.key = new_key;
        self.persist_all()?;
        info!("Vault store re-encrypted under new key");
        Ok(())
    }

    // Password entries

    pub fn password_entries(&self) -> &[PasswordEntry] {
        &self.data.passwords
    }

    /// Upsert a password entry. An entry carrying a known id is replaced in
    /// place with `modified` stamped; anything else gets a fresh id and both
    /// timestamps stamped.
    pub fn save_password(&mut self, mut entry: PasswordEntry) -> Result<PasswordEntry> {
        let now = Utc::now();
        let existing = self
            .data
            .passwords
            .iter()
            .position(|e| !entry.id.is_empty() && e.id == entry.id);

        match existing {
            Some(idx) => {
                entry.created = self.data.passwords[idx].created;
                entry.modified = now;
                self.data.passwords[idx] = entry.clone();
            }
            None => {
                entry.id = Uuid::new_v4().to_string();
                entry.created = now;
                entry.modified = now;
                self.data.passwords.push(entry.clone());
            }
        }

        self.persist(&[COLLECTION_PASSWORDS])?;
        Ok(entry)
    }

    /// Delete by id. Deleting a missing id is a no-op, not an error.
    pub fn delete_password(&mut self, id: &str) -> Result<()> {
        let before = self.data.passwords.len();
        self.data.passwords.retain(|e| e.id != id);
        if self.data.passwords.len() != before {
            self.persist(&[COLLECTION_PASSWORDS])?;
        }
        Ok(())
    }

    // TOTP entries

    pub fn totp_entries(&self) -> &[TotpEntry] {
        &self.data.totp
    }

    pub fn save_totp(&mut self, mut entry: TotpEntry) -> Result<TotpEntry> {
        if !matches!(entry.digits, 6 | 8) {
            return Err(VaultError::Validation(
                "TOTP digits must be 6 or 8".to_string(),
            ));
        }
        if !matches!(entry.period, 30 | 60) {
            return Err(VaultError::Validation(
                "TOTP period must be 30 or 60 seconds".to_string(),
            ));
        }

        let now = Utc::now();
        let existing = self
            .data
            .totp
            .iter()
            .position(|e| !entry.id.is_empty() && e.id == entry.id);

        match existing {
            Some(idx) => {
                entry.created = self.data.totp[idx].created;
                entry.modified = now;
                self.data.totp[idx] = entry.clone();
            }
            None => {
                entry.id = Uuid::new_v4().to_string();
                entry.created = now;
                entry.modified = now;
                self.data.totp.push(entry.clone());
            }
        }

        self.persist(&[COLLECTION_TOTP])?;
        Ok(entry)
    }

    pub fn delete_totp(&mut self, id: &str) -> Result<()> {
        let before = self.data.totp.len();
        self.data.totp.retain(|e| e.id != id);
        if self.data.totp.len() != before {
            self.persist(&[COLLECTION_TOTP])?;
        }
        Ok(())
    }

    // Categories

    pub fn categories(&self) -> &[Category] {
        &self.data.categories
    }

    pub fn save_category(&mut self, mut category: Category) -> Result<Category> {
        let existing = self
            .data
            .categories
            .iter()
            .position(|c| !category.id.is_empty() && c.id == category.id);

        match existing {
            Some(idx) => self.data.categories[idx] = category.clone(),
            None => {
                category.id = Uuid::new_v4().to_string();
                self.data.categories.push(category.clone());
            }
        }

        self.persist(&[COLLECTION_CATEGORIES])?;
        Ok(category)
    }

    /// Delete a category and clear (not delete) the category field on every
    /// password entry referencing it, in one transaction.
    pub fn delete_category(&mut self, id: &str) -> Result<()> {
        let Some(idx) = self.data.categories.iter().position(|c| c.id == id) else {
            return Ok(());
        };
        let name = self.data.categories[idx].name.clone();
        self.data.categories.remove(idx);

        let now = Utc::now();
        for entry in &mut self.data.passwords {
            if entry.category == name {
                entry.category.clear();
                entry.modified = now;
            }
        }

        self.persist(&[COLLECTION_CATEGORIES, COLLECTION_PASSWORDS])
    }

    /// Merge a batch of imported records in one transaction (all or nothing).
    ///
    /// Every record is treated as new: ids and timestamps are expected to be
    /// freshly assigned by the validation layer before merging.
    pub fn put_batch(&mut self, records: Vec<VaultRecord>) -> Result<usize> {
        let count = records.len();
        let snapshot = self.data.clone();

        for record in records {
            match record {
                VaultRecord::Password(e) => self.data.passwords.push(e),
                VaultRecord::Totp(e) => self.data.totp.push(e),
            }
        }

        if let Err(e) = self.persist(&[COLLECTION_PASSWORDS, COLLECTION_TOTP]) {
            self.data = snapshot;
            return Err(e);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::{derive_key, EncryptionSalt};

    fn test_key() -> DerivedKey {
        DerivedKey::from_bytes(rand::random())
    }

    fn temp_store() -> (tempfile::TempDir, VaultStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = VaultStore::initialize(dir.path().join("vault.db"), test_key()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_assigns_id_and_timestamps() {
        let (_dir, mut store) = temp_store();

        let saved = store
            .save_password(PasswordEntry::new("Example", "hunter2"))
            .unwrap();
        assert!(!saved.id.is_empty());
        assert_eq!(saved.created, saved.modified);
        assert_eq!(store.password_entries().len(), 1);
    }

    #[test]
    fn test_save_with_existing_id_replaces_in_place() {
        let (_dir, mut store) = temp_store();

        let saved = store
            .save_password(PasswordEntry::new("Example", "hunter2"))
            .unwrap();

        let mut updated = saved.clone();
        updated.password = "hunter3".to_string();
        let updated = store.save_password(updated).unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.created, saved.created);
        assert!(updated.modified >= saved.modified);
        assert_eq!(store.password_entries().len(), 1);
        assert_eq!(store.password_entries()[0].password, "hunter3");
    }

    #[test]
    fn test_delete_missing_id_is_noop() {
        let (_dir, mut store) = temp_store();
        store.delete_password("no-such-id").unwrap();
        store.delete_totp("no-such-id").unwrap();
        store.delete_category("no-such-id").unwrap();
    }

    #[test]
    fn test_reopen_with_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");
        let salt = EncryptionSalt::generate();
        let key = derive_key("master", &salt);

        let mut store = VaultStore::initialize(&path, key.clone()).unwrap();
        store
            .save_password(PasswordEntry::new("Example", "hunter2"))
            .unwrap();
        drop(store);

        let reopened = VaultStore::open(&path, key).unwrap();
        assert_eq!(reopened.password_entries().len(), 1);
        assert_eq!(reopened.password_entries()[0].name, "Example");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        let mut store = VaultStore::initialize(&path, test_key()).unwrap();
        store
            .save_password(PasswordEntry::new("Example", "hunter2"))
            .unwrap();
        drop(store);

        assert!(VaultStore::open(&path, test_key()).is_err());
    }

    #[test]
    fn test_rekey_reopens_under_new_key_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");
        let salt = EncryptionSalt::generate();
        let old_key = derive_key("old", &salt);
        let new_key = derive_key("new", &salt);

        let mut store = VaultStore::initialize(&path, old_key.clone()).unwrap();
        store
            .save_password(PasswordEntry::new("Example", "hunter2"))
            .unwrap();
        store.rekey(new_key.clone()).unwrap();
        drop(store);

        assert!(VaultStore::open(&path, old_key).is_err());
        let reopened = VaultStore::open(&path, new_key).unwrap();
        assert_eq!(reopened.password_entries().len(), 1);
    }

    #[test]
    fn test_totp_validation() {
        let (_dir, mut store) = temp_store();

        let mut entry = TotpEntry::new("Acme", "JBSWY3DPEHPK3PXP");
        entry.digits = 7;
        assert!(matches!(
            store.save_totp(entry),
            Err(VaultError::Validation(_))
        ));

        let mut entry = TotpEntry::new("Acme", "JBSWY3DPEHPK3PXP");
        entry.period = 45;
        assert!(matches!(
            store.save_totp(entry),
            Err(VaultError::Validation(_))
        ));

        let entry = TotpEntry::new("Acme", "JBSWY3DPEHPK3PXP");
        assert!(store.save_totp(entry).is_ok());
    }

    #[test]
    fn test_category_delete_clears_references() {
        let (_dir, mut store) = temp_store();

        let category = store.save_category(Category::new("Work")).unwrap();

        let mut entry = PasswordEntry::new("Example", "hunter2");
        entry.category = "Work".to_string();
        store.save_password(entry).unwrap();

        store.delete_category(&category.id).unwrap();

        assert!(store.categories().is_empty());
        assert_eq!(store.password_entries().len(), 1);
        assert!(store.password_entries()[0].category.is_empty());
    }

    #[test]
    fn test_put_batch() {
        let (_dir, mut store) = temp_store();

        let mut p = PasswordEntry::new("Example", "hunter2");
        p.id = Uuid::new_v4().to_string();
        let mut t = TotpEntry::new("Acme", "JBSWY3DPEHPK3PXP");
        t.id = Uuid::new_v4().to_string();

        let count = store
            .put_batch(vec![VaultRecord::Password(p), VaultRecord::Totp(t)])
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.password_entries().len(), 1);
        assert_eq!(store.totp_entries().len(), 1);
    }
}
