//! AES-256-GCM encryption and decryption for vault data.
//!
//! Uses AES-256-GCM with:
//! - 256-bit key (the derived vault key)
//! - 96-bit (12 byte) nonce, random per encryption
//! - 128-bit authentication tag

use crate::crypto::{kdf::DerivedKey, CryptoError, Result};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use serde::{Deserialize, Serialize};

/// An encrypted blob with its nonce and authentication tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// Unique nonce for this blob (12 bytes)
    pub nonce: [u8; 12],

    /// Encrypted data
    pub ciphertext: Vec<u8>,

    /// Authentication tag (16 bytes)
    pub auth_tag: [u8; 16],
}

/// Encrypt data under the derived vault key.
///
/// Each encryption uses a fresh random nonce; the nonce travels with the
/// ciphertext for later decryption.
pub fn encrypt_blob(key: &DerivedKey, plaintext: &[u8]) -> Result<EncryptedBlob> {
    if plaintext.is_empty() {
        return Err(CryptoError::EncryptionFailed(
            "Cannot encrypt empty data".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let nonce_bytes: [u8; 12] = nonce.into();

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(format!("{}", e)))?;

    // AES-GCM appends the auth tag to the ciphertext
    if ciphertext.len() < 16 {
        return Err(CryptoError::EncryptionFailed(
            "Ciphertext too short - missing auth tag".to_string(),
        ));
    }

    let tag_start = ciphertext.len() - 16;
    let auth_tag: [u8; 16] = ciphertext[tag_start..]
        .try_into()
        .map_err(|_| CryptoError::EncryptionFailed("Invalid auth tag length".to_string()))?;

    Ok(EncryptedBlob {
        nonce: nonce_bytes,
        ciphertext: ciphertext[..tag_start].to_vec(),
        auth_tag,
    })
}

/// Decrypt a blob under the derived vault key.
///
/// Fails with `AuthenticationFailed` if the tag does not verify, which covers
/// both wrong keys and tampered ciphertext.
pub fn decrypt_blob(key: &DerivedKey, encrypted: &EncryptedBlob) -> Result<Vec<u8>> {
    if encrypted.ciphertext.is_empty() {
        return Err(CryptoError::DecryptionFailed(
            "Cannot decrypt empty data".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from(encrypted.nonce);

    let mut ciphertext_with_tag = encrypted.ciphertext.clone();
    ciphertext_with_tag.extend_from_slice(&encrypted.auth_tag);

    cipher
        .decrypt(&nonce, ciphertext_with_tag.as_slice())
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> DerivedKey {
        DerivedKey::from_bytes(rand::random())
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"Hello, World! This is a test.";

        let encrypted = encrypt_blob(&key, plaintext).unwrap();
        let decrypted = decrypt_blob(&key, &encrypted).unwrap();

        assert_eq!(plaintext.to_vec(), decrypted);
    }

    #[test]
    fn test_different_nonces() {
        let key = test_key();
        let plaintext = b"Same data";

        let encrypted1 = encrypt_blob(&key, plaintext).unwrap();
        let encrypted2 = encrypt_blob(&key, plaintext).unwrap();

        assert_ne!(encrypted1.nonce, encrypted2.nonce);
        assert_ne!(encrypted1.ciphertext, encrypted2.ciphertext);
        assert_eq!(
            decrypt_blob(&key, &encrypted1).unwrap(),
            decrypt_blob(&key, &encrypted2).unwrap()
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = test_key();
        let key2 = test_key();

        let encrypted = encrypt_blob(&key1, b"Secret data").unwrap();
        assert!(decrypt_blob(&key2, &encrypted).is_err());
    }

    #[test]
    fn test_tampering_detected() {
        let key = test_key();
        let mut encrypted = encrypt_blob(&key, b"Original data").unwrap();

        encrypted.ciphertext[0] ^= 0xFF;

        assert!(matches!(
            decrypt_blob(&key, &encrypted),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_empty_data_fails() {
        let key = test_key();

        assert!(encrypt_blob(&key, b"").is_err());
        assert!(decrypt_blob(
            &key,
            &EncryptedBlob {
                nonce: [0u8; 12],
                ciphertext: vec![],
                auth_tag: [0u8; 16],
            }
        )
        .is_err());
    }
}
