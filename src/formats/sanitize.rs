//! Uniform validation and sanitization applied to every parsed record
//! before it is accepted into the vault.

use crate::store::models::{PasswordEntry, TotpEntry, VaultRecord};
use uuid::Uuid;

const MAX_FIELD_LEN: usize = 1000;

/// Label for accepted entries whose source row carried no name.
const PLACEHOLDER_NAME: &str = "Imported entry";

/// Pre-validation password-entry shape produced by the vendor adapters.
#[derive(Debug, Clone, Default)]
pub struct RawPassword {
    pub name: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub category: String,
    pub notes: String,
    pub tags: Vec<String>,
}

/// Pre-validation TOTP-entry shape.
#[derive(Debug, Clone, Default)]
pub struct RawTotp {
    pub name: String,
    pub issuer: String,
    pub secret: String,
    pub digits: u8,
    pub period: u32,
    pub tags: Vec<String>,
}

/// The kind of every record is decided once, by the adapter that parsed it.
#[derive(Debug, Clone)]
pub enum RawRecord {
    Password(RawPassword),
    Totp(RawTotp),
}

/// Trim and truncate a free-text field.
pub fn clean(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() <= MAX_FIELD_LEN {
        trimmed.to_string()
    } else {
        trimmed.chars().take(MAX_FIELD_LEN).collect()
    }
}

/// Prepend `https://` to URLs that lack a scheme. Empty input stays empty.
pub fn normalize_url(url: &str) -> String {
    let cleaned = clean(url);
    if cleaned.is_empty() || cleaned.contains("://") {
        cleaned
    } else {
        format!("https://{}", cleaned)
    }
}

/// Validate a raw record and convert it into a vault record with a fresh id
/// and import-time timestamps. Rejections return a reason string and never
/// abort the surrounding batch.
pub fn sanitize_record(raw: RawRecord) -> std::result::Result<VaultRecord, String> {
    match raw {
        RawRecord::Password(p) => {
            let name = clean(&p.name);
            let password = clean(&p.password);
            if password.is_empty() {
                if name.is_empty() {
                    return Err("entry has neither a name nor a password".to_string());
                }
                return Err(format!("'{}' has no password", name));
            }
            let name = if name.is_empty() {
                PLACEHOLDER_NAME.to_string()
            } else {
                name
            };

            let mut entry = PasswordEntry::new(name, password);
            entry.id = Uuid::new_v4().to_string();
            entry.username = clean(&p.username);
            entry.url = normalize_url(&p.url);
            entry.category = clean(&p.category);
            entry.notes = clean(&p.notes);
            entry.tags = p.tags.iter().map(|t| clean(t)).filter(|t| !t.is_empty()).collect();
            Ok(VaultRecord::Password(entry))
        }
        RawRecord::Totp(t) => {
            let name = clean(&t.name);
            let secret = clean(&t.secret);
            if secret.is_empty() {
                if name.is_empty() {
                    return Err("TOTP entry has neither a name nor a secret".to_string());
                }
                return Err(format!("TOTP entry '{}' has no secret", name));
            }
            let name = if name.is_empty() {
                PLACEHOLDER_NAME.to_string()
            } else {
                name
            };
            if t.digits != 6 && t.digits != 8 {
                return Err(format!("'{}' has unsupported TOTP digits {}", name, t.digits));
            }
            if t.period != 30 && t.period != 60 {
                return Err(format!("'{}' has unsupported TOTP period {}", name, t.period));
            }

            let mut entry = TotpEntry::new(name, secret);
            entry.id = Uuid::new_v4().to_string();
            entry.issuer = clean(&t.issuer);
            entry.digits = t.digits;
            entry.period = t.period;
            entry.tags = t.tags.iter().map(|t| clean(t)).filter(|t| !t.is_empty()).collect();
            Ok(VaultRecord::Totp(entry))
        }
    }
}
