//! Password health audit: weak, reused, and stale entries.

use crate::store::models::PasswordEntry;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entries not modified for this long count as old.
const OLD_AFTER_DAYS: i64 = 180;

/// Strength rating for a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordStrength {
    VeryWeak,
    Weak,
    Fair,
    Good,
    Strong,
}

impl PasswordStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            PasswordStrength::VeryWeak => "Very Weak",
            PasswordStrength::Weak => "Weak",
            PasswordStrength::Fair => "Fair",
            PasswordStrength::Good => "Good",
            PasswordStrength::Strong => "Strong",
        }
    }
}

/// Estimate entropy in bits from length and character-class coverage.
pub fn entropy_bits(password: &str) -> f64 {
    if password.is_empty() {
        return 0.0;
    }

    let mut charset = 0usize;
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        charset += 26;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        charset += 26;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        charset += 10;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        charset += 32;
    }

    password.chars().count() as f64 * (charset.max(1) as f64).log2()
}

/// Rate a password from its estimated entropy.
pub fn rate_password(password: &str) -> PasswordStrength {
    let bits = entropy_bits(password);
    if password.chars().count() < 8 || bits < 28.0 {
        PasswordStrength::VeryWeak
    } else if bits < 40.0 {
        PasswordStrength::Weak
    } else if bits < 60.0 {
        PasswordStrength::Fair
    } else if bits < 80.0 {
        PasswordStrength::Good
    } else {
        PasswordStrength::Strong
    }
}

/// Per-entry audit findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditDetail {
    pub id: String,
    pub name: String,
    pub strength: PasswordStrength,
    pub weak: bool,
    pub reused: bool,
    pub old: bool,
}

/// Vault-wide audit summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordAuditReport {
    pub total: usize,
    pub weak: usize,
    pub reused: usize,
    pub old: usize,
    pub details: Vec<AuditDetail>,
}

/// Audit all password entries for weak, reused, and stale passwords.
pub fn audit_passwords(entries: &[PasswordEntry]) -> PasswordAuditReport {
    let mut usage: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        *usage.entry(entry.password.as_str()).or_default() += 1;
    }

    let stale_cutoff = Utc::now() - Duration::days(OLD_AFTER_DAYS);
    let mut details = Vec::with_capacity(entries.len());
    for entry in entries {
        let strength = rate_password(&entry.password);
        details.push(AuditDetail {
            id: entry.id.clone(),
            name: entry.name.clone(),
            strength,
            weak: strength <= PasswordStrength::Weak,
            reused: usage.get(entry.password.as_str()).copied().unwrap_or(0) > 1,
            old: entry.modified < stale_cutoff,
        });
    }

    PasswordAuditReport {
        total: entries.len(),
        weak: details.iter().filter(|d| d.weak).count(),
        reused: details.iter().filter(|d| d.reused).count(),
        old: details.iter().filter(|d| d.old).count(),
        details,
    }
}
