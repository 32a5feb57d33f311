//! Vault record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored password credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordEntry {
    /// Unique, immutable id. Empty until first save.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub url: String,
    /// Display-key reference to a category name; not an enforced foreign key.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

impl PasswordEntry {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            username: String::new(),
            password: password.into(),
            url: String::new(),
            category: String::new(),
            notes: String::new(),
            tags: Vec::new(),
            created: now,
            modified: now,
        }
    }
}

/// A stored TOTP credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotpEntry {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    /// Base32-encoded shared secret.
    pub secret: String,
    pub digits: u8,
    /// Time step in seconds.
    pub period: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub modified: DateTime<Utc>,
}

impl TotpEntry {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            issuer: String::new(),
            secret: secret.into(),
            digits: 6,
            period: 30,
            tags: Vec::new(),
            created: now,
            modified: now,
        }
    }
}

/// An entry category. Deletion clears, never cascades to, referencing
/// password entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            color: String::new(),
            icon: String::new(),
        }
    }
}

/// Tagged union over importable vault records.
///
/// The discriminant is fixed once, at parse/validation time; it is never
/// re-inferred from field shape later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultRecord {
    Password(PasswordEntry),
    Totp(TotpEntry),
}

impl VaultRecord {
    pub fn name(&self) -> &str {
        match self {
            VaultRecord::Password(e) => &e.name,
            VaultRecord::Totp(e) => &e.name,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            VaultRecord::Password(e) => &e.id,
            VaultRecord::Totp(e) => &e.id,
        }
    }
}
