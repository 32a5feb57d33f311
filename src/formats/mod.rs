//! Interchange format codecs: detection, vendor adapters, sanitization, and
//! the encrypted backup container.
//!
//! Everything in this module is pure string-in/record-out; file I/O belongs
//! to the orchestrator in `import_export`.

pub mod backup;
pub mod bitwarden;
pub mod chrome;
pub mod csv;
pub mod firefox;
pub mod keepass;
pub mod lastpass;
pub mod native;
pub mod sanitize;
pub mod winauth;

pub use sanitize::{sanitize_record, RawPassword, RawRecord, RawTotp};

/// A recognized import source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    LastPass,
    Bitwarden,
    KeePass,
    Chrome,
    Firefox,
    WinAuth,
    EncryptedBackup,
    GenericJson,
    GenericCsv,
}

impl std::fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImportFormat::LastPass => "lastpass",
            ImportFormat::Bitwarden => "bitwarden",
            ImportFormat::KeePass => "keepass",
            ImportFormat::Chrome => "chrome",
            ImportFormat::Firefox => "firefox",
            ImportFormat::WinAuth => "winauth",
            ImportFormat::EncryptedBackup => "encrypted-backup",
            ImportFormat::GenericJson => "json",
            ImportFormat::GenericCsv => "csv",
        };
        write!(f, "{}", name)
    }
}

/// Detect an import format from the filename and content. Ordered; the first
/// rule that matches wins.
pub fn detect(filename: &str, content: &str) -> ImportFormat {
    let lower = filename.to_ascii_lowercase();

    // 1. Filename sentinels: extension first, then vendor tokens.
    if lower.ends_with(".svault") {
        return ImportFormat::EncryptedBackup;
    }
    if lower.ends_with(".wa.txt") || lower.contains("winauth") {
        return ImportFormat::WinAuth;
    }
    if lower.contains("lastpass") {
        return ImportFormat::LastPass;
    }
    if lower.contains("bitwarden") {
        return ImportFormat::Bitwarden;
    }
    if lower.contains("keepass") {
        return ImportFormat::KeePass;
    }
    if lower.contains("chrome") {
        return ImportFormat::Chrome;
    }
    if lower.contains("firefox") {
        return ImportFormat::Firefox;
    }

    // 2. JSON shape probe.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(content) {
        if value.get("encrypted_data").is_some() || value.get("ciphertext").is_some() {
            return ImportFormat::EncryptedBackup;
        }
        if value.get("logins").map(|v| v.is_array()).unwrap_or(false) {
            return ImportFormat::Firefox;
        }
        if value.get("items").map(|v| v.is_array()).unwrap_or(false) {
            return ImportFormat::Bitwarden;
        }
        return ImportFormat::GenericJson;
    }

    // 3. Line-oriented text.
    let first_line = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    if first_line.starts_with("otpauth://") {
        return ImportFormat::WinAuth;
    }

    let header = first_line.to_ascii_lowercase();
    let header: Vec<&str> = header.split(',').map(str::trim).collect();
    if header.len() >= 3 && header[0] == "url" && header[1] == "username" && header[2] == "password" {
        return ImportFormat::LastPass;
    }
    if header.len() >= 4
        && header[0] == "title"
        && header[1] == "username"
        && header[2] == "password"
        && header[3] == "url"
    {
        return ImportFormat::KeePass;
    }
    if header.len() >= 4
        && header[0] == "name"
        && header[1] == "url"
        && header[2] == "username"
        && header[3] == "password"
    {
        return ImportFormat::Chrome;
    }

    ImportFormat::GenericCsv
}
