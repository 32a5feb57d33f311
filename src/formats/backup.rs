//! Encrypted `.svault` backup codec.
//!
//! Pipeline: JSON envelope -> deflate -> AES-256-GCM under a key derived
//! from the backup password and a fresh salt. The on-disk container is JSON
//! with hex-encoded fields; the GCM tag rides at the tail of `ciphertext`
//! so the historical field layout is preserved.

use super::native::VaultEnvelope;
use crate::crypto::cipher::{decrypt_blob, encrypt_blob, EncryptedBlob};
use crate::crypto::kdf::{derive_key, EncryptionSalt};
use crate::{Result, VaultError};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const BACKUP_ALGORITHM: &str = "aes-256-gcm";

#[derive(Debug, Serialize, Deserialize)]
struct BackupContainer {
    algorithm: String,
    salt: String,
    iv: String,
    ciphertext: String,
}

/// Encrypt a vault envelope into a `.svault` container string.
pub fn encode(envelope: &VaultEnvelope, password: &str) -> Result<String> {
    let json = serde_json::to_vec(envelope)
        .map_err(|e| VaultError::InvalidInput(format!("Backup serialization failed: {}", e)))?;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    let salt = EncryptionSalt::generate();
    let key = derive_key(password, &salt);
    let blob = encrypt_blob(&key, &compressed)?;

    let mut ciphertext = blob.ciphertext.clone();
    ciphertext.extend_from_slice(&blob.auth_tag);

    let container = BackupContainer {
        algorithm: BACKUP_ALGORITHM.to_string(),
        salt: salt.to_hex(),
        iv: hex::encode(blob.nonce),
        ciphertext: hex::encode(ciphertext),
    };
    serde_json::to_string_pretty(&container)
        .map_err(|e| VaultError::InvalidInput(format!("Backup serialization failed: {}", e)))
}

/// Decrypt a `.svault` container. A wrong password or tampered ciphertext
/// fails with `Decryption`, never a silently empty vault.
pub fn decode(content: &str, password: &str) -> Result<VaultEnvelope> {
    let container: BackupContainer = serde_json::from_str(content)
        .map_err(|_| VaultError::InvalidInput("Not a valid backup container".to_string()))?;

    if container.algorithm != BACKUP_ALGORITHM {
        return Err(VaultError::UnsupportedFormat(container.algorithm));
    }

    let salt = EncryptionSalt::from_hex(&container.salt)
        .map_err(|_| VaultError::InvalidInput("Backup salt is malformed".to_string()))?;
    let iv = hex::decode(&container.iv)
        .map_err(|_| VaultError::InvalidInput("Backup IV is malformed".to_string()))?;
    let nonce: [u8; 12] = iv
        .try_into()
        .map_err(|_| VaultError::InvalidInput("Backup IV has wrong length".to_string()))?;
    let mut ciphertext = hex::decode(&container.ciphertext)
        .map_err(|_| VaultError::InvalidInput("Backup ciphertext is malformed".to_string()))?;
    if ciphertext.len() < 16 {
        return Err(VaultError::InvalidInput(
            "Backup ciphertext is truncated".to_string(),
        ));
    }

    let tag_start = ciphertext.len() - 16;
    let auth_tag: [u8; 16] = ciphertext
        .split_off(tag_start)
        .try_into()
        .map_err(|_| VaultError::Decryption)?;

    let key = derive_key(password, &salt);
    let blob = EncryptedBlob {
        nonce,
        ciphertext,
        auth_tag,
    };
    let compressed = decrypt_blob(&key, &blob).map_err(|_| VaultError::Decryption)?;

    let mut json = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(|_| VaultError::Decryption)?;

    serde_json::from_slice(&json).map_err(|_| VaultError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{PasswordEntry, TotpEntry};

    fn sample_envelope() -> VaultEnvelope {
        VaultEnvelope::new(
            vec![PasswordEntry::new("Site", "hunter2")],
            vec![TotpEntry::new("GitHub", "JBSWY3DPEHPK3PXP")],
            Vec::new(),
        )
    }

    #[test]
    fn test_round_trip() {
        let encoded = encode(&sample_envelope(), "backup password").unwrap();
        let decoded = decode(&encoded, "backup password").unwrap();
        assert_eq!(decoded.passwords.len(), 1);
        assert_eq!(decoded.passwords[0].name, "Site");
        assert_eq!(decoded.totp[0].secret, "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn test_wrong_password_fails_distinguishably() {
        let encoded = encode(&sample_envelope(), "backup password").unwrap();
        assert!(matches!(
            decode(&encoded, "wrong password"),
            Err(VaultError::Decryption)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let encoded = encode(&sample_envelope(), "backup password").unwrap();
        let mut container: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        let mut ciphertext = container["ciphertext"].as_str().unwrap().to_string();
        // Flip one hex digit.
        let flipped = if ciphertext.remove(0) == '0' { '1' } else { '0' };
        ciphertext.insert(0, flipped);
        container["ciphertext"] = serde_json::Value::String(ciphertext);

        assert!(matches!(
            decode(&container.to_string(), "backup password"),
            Err(VaultError::Decryption)
        ));
    }

    #[test]
    fn test_legacy_cbc_container_rejected() {
        let encoded = encode(&sample_envelope(), "backup password").unwrap();
        let mut container: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        container["algorithm"] = serde_json::Value::String("aes-256-cbc".to_string());
        assert!(matches!(
            decode(&container.to_string(), "backup password"),
            Err(VaultError::UnsupportedFormat(algo)) if algo == "aes-256-cbc"
        ));
    }

    #[test]
    fn test_tag_only_ciphertext_fails_decryption() {
        let encoded = encode(&sample_envelope(), "backup password").unwrap();
        let mut container: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        // Exactly one tag's worth of bytes leaves no ciphertext at all.
        container["ciphertext"] = serde_json::Value::String("00".repeat(16));
        assert!(matches!(
            decode(&container.to_string(), "backup password"),
            Err(VaultError::Decryption)
        ));
    }

    #[test]
    fn test_garbage_input_rejected() {
        assert!(decode("not a container", "pw").is_err());
    }

    #[test]
    fn test_container_has_expected_fields() {
        let encoded = encode(&sample_envelope(), "pw").unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["algorithm"], BACKUP_ALGORITHM);
        assert_eq!(value["salt"].as_str().unwrap().len(), 64);
        assert_eq!(value["iv"].as_str().unwrap().len(), 24);
    }
}
