//! AES-256-GCM authenticated encryption.
//!
//! Each call to `encrypt` draws a fresh random 12-byte nonce from the OS
//! RNG and returns it next to the ciphertext.  `decrypt` fails with
//! `AuthenticationFailed` for a wrong key, a flipped bit, a truncated
//! ciphertext or a nonce of the wrong size.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{KeystashError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// One sealed value: the nonce it was encrypted under and the
/// ciphertext with its auth tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` with a 32-byte `key` under a fresh nonce.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| KeystashError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| KeystashError::EncryptionFailed(format!("encryption error: {e}")))?;

    Ok(Sealed {
        nonce: nonce.to_vec(),
        ciphertext,
    })
}

/// Decrypt and authenticate a value produced by `encrypt`.
pub fn decrypt(key: &[u8], sealed: &Sealed) -> Result<Vec<u8>> {
    if sealed.nonce.len() != NONCE_LEN || sealed.ciphertext.len() < TAG_LEN {
        return Err(KeystashError::AuthenticationFailed);
    }

    let nonce = Nonce::from_slice(&sealed.nonce);
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| KeystashError::AuthenticationFailed)?;

    cipher
        .decrypt(nonce, sealed.ciphertext.as_slice())
        .map_err(|_| KeystashError::AuthenticationFailed)
}
