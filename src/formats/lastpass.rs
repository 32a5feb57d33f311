//! LastPass CSV adapter.
//!
//! Column order: `url,username,password,totp,extra,name,grouping,fav`.

use super::csv::{column, escape_field, parse_csv};
use super::sanitize::{RawPassword, RawRecord, RawTotp};
use crate::store::models::PasswordEntry;
use std::fmt::Write;

pub fn parse(content: &str) -> Vec<RawRecord> {
    let records = parse_csv(content);
    let Some((_header, rows)) = records.split_first() else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for row in rows {
        let name = column(row, 5);
        let totp = column(row, 3);

        out.push(RawRecord::Password(RawPassword {
            url: column(row, 0),
            username: column(row, 1),
            password: column(row, 2),
            notes: column(row, 4),
            name: name.clone(),
            category: column(row, 6),
            tags: vec!["lastpass".to_string()],
        }));

        // A populated totp column yields a second, TOTP-kind record for the
        // same site.
        if !totp.trim().is_empty() {
            out.push(RawRecord::Totp(RawTotp {
                name,
                issuer: String::new(),
                secret: totp,
                digits: 6,
                period: 30,
                tags: vec!["lastpass".to_string()],
            }));
        }
    }
    out
}

/// Serialize password entries as a LastPass-importable CSV.
pub fn export(entries: &[PasswordEntry]) -> String {
    let mut out = String::from("url,username,password,totp,extra,name,grouping,fav\n");
    for entry in entries {
        let _ = writeln!(
            out,
            "{},{},{},,{},{},{},0",
            escape_field(&entry.url),
            escape_field(&entry.username),
            escape_field(&entry.password),
            escape_field(&entry.notes),
            escape_field(&entry.name),
            escape_field(&entry.category),
        );
    }
    out
}
