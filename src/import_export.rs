//! Import/export orchestration: format detection, codec dispatch, and
//! transactional merge into the vault store.

use crate::formats::{self, sanitize_record, ImportFormat, RawRecord};
use crate::session::SessionManager;
use crate::store::models::VaultRecord;
use crate::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Per-import outcome report. Entry-level rejections land in `errors`
/// without aborting the rest of the batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportReport {
    pub format: ImportFormat,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub entries: Vec<VaultRecord>,
}

/// A recognized export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    NativeCsv,
    NativeJson,
    LastPassCsv,
    BitwardenJson,
    WinAuthUris,
    EncryptedBackup,
}

impl std::str::FromStr for ExportFormat {
    type Err = VaultError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::NativeCsv),
            "json" => Ok(ExportFormat::NativeJson),
            "lastpass" => Ok(ExportFormat::LastPassCsv),
            "bitwarden" => Ok(ExportFormat::BitwardenJson),
            "winauth" => Ok(ExportFormat::WinAuthUris),
            "svault" | "backup" => Ok(ExportFormat::EncryptedBackup),
            other => Err(VaultError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Import raw file content into the vault. The vault must be unlocked; the
/// accepted batch is applied atomically.
pub fn import(
    session: &mut SessionManager,
    filename: &str,
    content: &str,
    password: Option<&str>,
) -> Result<ImportReport> {
    // Fail on a locked vault before any parsing work happens.
    session.store()?;

    let format = formats::detect(filename, content);
    let (raw_records, mut errors) = parse_by_format(format, content, password)?;

    let mut entries = Vec::new();
    for raw in raw_records {
        match sanitize_record(raw) {
            Ok(record) => entries.push(record),
            Err(reason) => errors.push(reason),
        }
    }

    let imported = session.store_mut()?.put_batch(entries.clone())?;
    info!(
        format = %format,
        imported,
        skipped = errors.len(),
        "Import completed"
    );

    Ok(ImportReport {
        format,
        imported,
        skipped: errors.len(),
        errors,
        entries,
    })
}

/// Import from a file path.
pub fn import_file(
    session: &mut SessionManager,
    path: &Path,
    password: Option<&str>,
) -> Result<ImportReport> {
    let content = std::fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    import(session, filename, &content, password)
}

fn parse_by_format(
    format: ImportFormat,
    content: &str,
    password: Option<&str>,
) -> Result<(Vec<RawRecord>, Vec<String>)> {
    match format {
        ImportFormat::LastPass => Ok((formats::lastpass::parse(content), Vec::new())),
        ImportFormat::KeePass => Ok((formats::keepass::parse(content), Vec::new())),
        ImportFormat::Chrome => Ok((formats::chrome::parse(content), Vec::new())),
        ImportFormat::Firefox => Ok((formats::firefox::parse(content)?, Vec::new())),
        ImportFormat::Bitwarden => Ok((formats::bitwarden::parse(content)?, Vec::new())),
        ImportFormat::WinAuth => Ok(formats::winauth::parse(content)),
        ImportFormat::GenericCsv => Ok((formats::csv::parse_generic(content), Vec::new())),
        ImportFormat::GenericJson => Ok((formats::native::parse_json(content)?, Vec::new())),
        ImportFormat::EncryptedBackup => {
            let password = password.ok_or_else(|| {
                VaultError::InvalidInput("Encrypted backup import requires a password".to_string())
            })?;
            let envelope = formats::backup::decode(content, password)?;
            let mut raw = Vec::new();
            for entry in envelope.passwords {
                raw.push(RawRecord::Password(formats::RawPassword {
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
                raw.push(RawRecord::Totp(formats::RawTotp {
                    name: entry.name,
                    issuer: entry.issuer,
                    secret: entry.secret,
                    digits: entry.digits,
                    period: entry.period,
                    tags: entry.tags,
                }));
            }
            Ok((raw, Vec::new()))
        }
    }
}

/// Serialize the vault in the requested format. Returns the serialized
/// content plus the number of entries it covers.
pub fn export_string(
    session: &mut SessionManager,
    format: ExportFormat,
    password: Option<&str>,
) -> Result<(String, usize)> {
    let store = session.store()?;
    let passwords = store.password_entries().to_vec();
    let totp = store.totp_entries().to_vec();
    let categories = store.categories().to_vec();

    let (content, count) = match format {
        ExportFormat::NativeCsv => {
            let count = passwords.len();
            (formats::native::export_csv(&passwords), count)
        }
        ExportFormat::NativeJson => {
            let envelope = formats::native::VaultEnvelope::new(passwords, totp, categories);
            let count = envelope.entry_count();
            (formats::native::export_json(&envelope)?, count)
        }
        ExportFormat::LastPassCsv => {
            let count = passwords.len();
            (formats::lastpass::export(&passwords), count)
        }
        ExportFormat::BitwardenJson => {
            let count = passwords.len();
            (formats::bitwarden::export(&passwords)?, count)
        }
        ExportFormat::WinAuthUris => {
            let count = totp.len();
            (formats::winauth::export(&totp), count)
        }
        ExportFormat::EncryptedBackup => {
            let password = password.ok_or_else(|| {
                VaultError::InvalidInput("Encrypted backup export requires a password".to_string())
            })?;
            let envelope = formats::native::VaultEnvelope::new(passwords, totp, categories);
            let count = envelope.entry_count();
            (formats::backup::encode(&envelope, password)?, count)
        }
    };

    info!(count, "Export serialized");
    Ok((content, count))
}

/// Serialize the vault to a file.
pub fn export_file(
    session: &mut SessionManager,
    format: ExportFormat,
    path: &Path,
    password: Option<&str>,
) -> Result<usize> {
    let (content, count) = export_string(session, format, password)?;
    std::fs::write(path, content)?;
    Ok(count)
}
