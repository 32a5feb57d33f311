//! Native interchange formats: the 7-column CSV and the versioned JSON
//! envelope, plus the best-effort generic JSON importer.

use super::csv::{column, escape_field, parse_csv};
use super::sanitize::{RawPassword, RawRecord, RawTotp};
use crate::store::models::{Category, PasswordEntry, TotpEntry};
use crate::{Result, VaultError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

pub const ENVELOPE_VERSION: u32 = 1;
const CSV_HEADER: &str = "name,username,password,url,category,notes,tags";

/// Versioned JSON envelope for full-vault export.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultEnvelope {
    pub version: u32,
    pub exported_at: String,
    #[serde(default)]
    pub passwords: Vec<PasswordEntry>,
    #[serde(default)]
    pub totp: Vec<TotpEntry>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl VaultEnvelope {
    pub fn new(passwords: Vec<PasswordEntry>, totp: Vec<TotpEntry>, categories: Vec<Category>) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            passwords,
            totp,
            categories,
        }
    }

    pub fn entry_count(&self) -> usize {
        self.passwords.len() + self.totp.len()
    }
}

/// Serialize password entries as the native 7-column CSV.
pub fn export_csv(entries: &[PasswordEntry]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for entry in entries {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            escape_field(&entry.name),
            escape_field(&entry.username),
            escape_field(&entry.password),
            escape_field(&entry.url),
            escape_field(&entry.category),
            escape_field(&entry.notes),
            escape_field(&entry.tags.join(";")),
        );
    }
    out
}

/// Parse the native 7-column CSV.
pub fn parse_csv_export(content: &str) -> Vec<RawRecord> {
    let records = parse_csv(content);
    let Some((_header, rows)) = records.split_first() else {
        return Vec::new();
    };

    rows.iter()
        .map(|row| {
            RawRecord::Password(RawPassword {
                name: column(row, 0),
                username: column(row, 1),
                password: column(row, 2),
                url: column(row, 3),
                category: column(row, 4),
                notes: column(row, 5),
                tags: column(row, 6)
                    .split(';')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect(),
            })
        })
        .collect()
}

/// Serialize the vault as the versioned JSON envelope.
pub fn export_json(envelope: &VaultEnvelope) -> Result<String> {
    serde_json::to_string_pretty(envelope)
        .map_err(|e| VaultError::InvalidInput(format!("JSON serialization failed: {}", e)))
}

/// Parse generic JSON: the native envelope, or a best-effort scan of a
/// top-level array of objects with recognizable keys.
pub fn parse_json(content: &str) -> Result<Vec<RawRecord>> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| VaultError::InvalidInput(format!("Invalid JSON: {}", e)))?;

    if value.get("version").is_some()
        && (value.get("passwords").is_some() || value.get("totp").is_some())
    {
        let envelope: VaultEnvelope = serde_json::from_value(value)
            .map_err(|e| VaultError::InvalidInput(format!("Invalid vault envelope: {}", e)))?;
        let mut out = Vec::new();
        for entry in envelope.passwords {
            out.push(RawRecord::Password(RawPassword {
                name: entry.name,
                username: entry.username,
                password: entry.password,
                url: entry.url,
                category: entry.category,
                notes: entry.notes,
                tags: entry.tags,
            }));
        }
        for entry in envelope.totp {
            out.push(RawRecord::Totp(RawTotp {
                name: entry.name,
                issuer: entry.issuer,
                secret: entry.secret,
                digits: entry.digits,
                period: entry.period,
                tags: entry.tags,
            }));
        }
        return Ok(out);
    }

    let items = match &value {
        serde_json::Value::Array(items) => items.as_slice(),
        _ => {
            return Err(VaultError::InvalidInput(
                "JSON import expects a vault envelope or an array of entries".to_string(),
            ))
        }
    };

    let text = |obj: &serde_json::Value, keys: &[&str]| -> String {
        keys.iter()
            .filter_map(|k| obj.get(*k))
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .next()
            .unwrap_or_default()
    };

    Ok(items
        .iter()
        .map(|item| {
            let secret = text(item, &["secret", "totp"]);
            if !secret.trim().is_empty() {
                RawRecord::Totp(RawTotp {
                    name: text(item, &["name", "title"]),
                    issuer: text(item, &["issuer"]),
                    secret,
                    digits: 6,
                    period: 30,
                    tags: vec!["import".to_string()],
                })
            } else {
                RawRecord::Password(RawPassword {
                    name: text(item, &["name", "title", "site"]),
                    username: text(item, &["username", "user", "login", "email"]),
                    password: text(item, &["password", "pass"]),
                    url: text(item, &["url", "uri", "website"]),
                    category: text(item, &["category", "group", "folder"]),
                    notes: text(item, &["notes", "note"]),
                    tags: vec!["import".to_string()],
                })
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_round_trip() {
        let mut entry = PasswordEntry::new("Site, Inc", "pw");
        entry.tags = vec!["a".to_string(), "b".to_string()];
        let csv = export_csv(&[entry]);
        assert!(csv.starts_with(CSV_HEADER));

        let records = parse_csv_export(&csv);
        match &records[0] {
            RawRecord::Password(p) => {
                assert_eq!(p.name, "Site, Inc");
                assert_eq!(p.tags, vec!["a".to_string(), "b".to_string()]);
            }
            _ => panic!("expected password record"),
        }
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = VaultEnvelope::new(
            vec![PasswordEntry::new("Site", "pw")],
            vec![TotpEntry::new("GitHub", "JBSWY3DPEHPK3PXP")],
            Vec::new(),
        );
        let json = export_json(&envelope).unwrap();
        let records = parse_json(&json).unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], RawRecord::Password(_)));
        assert!(matches!(&records[1], RawRecord::Totp(_)));
    }

    #[test]
    fn test_generic_json_array() {
        let content = r#"[{"title": "Site", "login": "bob", "pass": "pw", "website": "x.com"}]"#;
        let records = parse_json(content).unwrap();
        match &records[0] {
            RawRecord::Password(p) => {
                assert_eq!(p.name, "Site");
                assert_eq!(p.username, "bob");
                assert_eq!(p.password, "pw");
                assert_eq!(p.url, "x.com");
            }
            _ => panic!("expected password record"),
        }
    }

    #[test]
    fn test_generic_json_rejects_scalars() {
        assert!(parse_json("42").is_err());
    }
}
