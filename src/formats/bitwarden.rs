//! Bitwarden JSON adapter (unencrypted vault export).

use super::sanitize::{RawPassword, RawRecord, RawTotp};
use crate::store::models::PasswordEntry;
use crate::totp::parse_otpauth_uri;
use crate::{Result, VaultError};
use serde::{Deserialize, Serialize};
use serde_json::json;

const TYPE_LOGIN: u8 = 1;

#[derive(Debug, Deserialize)]
struct BitwardenExport {
    #[serde(default)]
    folders: Vec<BitwardenFolder>,
    #[serde(default)]
    items: Vec<BitwardenItem>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BitwardenFolder {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct BitwardenItem {
    #[serde(rename = "type")]
    item_type: u8,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "folderId")]
    folder_id: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    login: Option<BitwardenLogin>,
}

#[derive(Debug, Deserialize)]
struct BitwardenLogin {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    totp: Option<String>,
    #[serde(default)]
    uris: Vec<BitwardenUri>,
}

#[derive(Debug, Deserialize)]
struct BitwardenUri {
    #[serde(default)]
    uri: Option<String>,
}

pub fn parse(content: &str) -> Result<Vec<RawRecord>> {
    let export: BitwardenExport = serde_json::from_str(content)
        .map_err(|e| VaultError::InvalidInput(format!("Invalid Bitwarden JSON: {}", e)))?;

    let folder_name = |id: &Option<String>| -> String {
        id.as_deref()
            .and_then(|id| export.folders.iter().find(|f| f.id == id))
            .map(|f| f.name.clone())
            .unwrap_or_default()
    };

    let mut out = Vec::new();
    for item in &export.items {
        if item.item_type != TYPE_LOGIN {
            continue;
        }
        let Some(login) = &item.login else { continue };

        out.push(RawRecord::Password(RawPassword {
            name: item.name.clone(),
            username: login.username.clone().unwrap_or_default(),
            password: login.password.clone().unwrap_or_default(),
            url: login
                .uris
                .first()
                .and_then(|u| u.uri.clone())
                .unwrap_or_default(),
            category: folder_name(&item.folder_id),
            notes: item.notes.clone().unwrap_or_default(),
            tags: vec!["bitwarden".to_string()],
        }));

        // The totp field holds either an otpauth URI or a bare base32 secret.
        if let Some(totp) = login.totp.as_deref().filter(|t| !t.trim().is_empty()) {
            let raw = if totp.starts_with("otpauth://") {
                match parse_otpauth_uri(totp) {
                    Ok(parsed) => RawTotp {
                        name: parsed.account_name.unwrap_or_else(|| item.name.clone()),
                        issuer: parsed.issuer.unwrap_or_default(),
                        secret: parsed.secret_base32,
                        digits: parsed.digits,
                        period: parsed.period,
                        tags: vec!["bitwarden".to_string()],
                    },
                    Err(_) => continue,
                }
            } else {
                RawTotp {
                    name: item.name.clone(),
                    issuer: String::new(),
                    secret: totp.to_string(),
                    digits: 6,
                    period: 30,
                    tags: vec!["bitwarden".to_string()],
                }
            };
            out.push(RawRecord::Totp(raw));
        }
    }
    Ok(out)
}

/// Serialize password entries as a Bitwarden-importable JSON export, with a
/// synthetic default folder so every item carries a folderId.
pub fn export(entries: &[PasswordEntry]) -> Result<String> {
    let folder_id = uuid::Uuid::new_v4().to_string();
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|entry| {
            json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "folderId": folder_id,
                "type": TYPE_LOGIN,
                "name": entry.name,
                "notes": entry.notes,
                "login": {
                    "username": entry.username,
                    "password": entry.password,
                    "uris": if entry.url.is_empty() {
                        Vec::new()
                    } else {
                        vec![json!({"match": null, "uri": entry.url})]
                    },
                },
            })
        })
        .collect();

    let export = json!({
        "encrypted": false,
        "folders": [{"id": folder_id, "name": "Imported"}],
        "items": items,
    });
    serde_json::to_string_pretty(&export)
        .map_err(|e| VaultError::InvalidInput(format!("Bitwarden serialization failed: {}", e)))
}
