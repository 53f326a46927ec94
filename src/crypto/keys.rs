//! The session key and the sub-keys derived from it with HKDF-SHA256.
//!
//! From a single derived key we expand:
//! - A **check key** used to seal the passphrase check value.
//! - A unique **per-entry** key for each entry name.
//!
//! HKDF (RFC 5869) uses the derived key as input keying material and a
//! context string (`info`) to produce independent sub-keys.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{KeystashError, Result};

/// Length of the derived key and every sub-key (256 bits).
pub const KEY_LEN: usize = 32;

/// Derive the key that seals the passphrase check value.
pub fn derive_check_key(key: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_derive(key, b"keystash-check")
}

/// Derive a per-entry encryption key.
///
/// `info` is `"keystash-entry:<name>"`, so a ciphertext moved under a
/// different name no longer authenticates.
pub fn derive_entry_key(key: &[u8], name: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let info = format!("keystash-entry:{name}");
    hkdf_derive(key, info.as_bytes())
}

// The derived key already has full entropy (it came from Argon2id), so
// the extract step runs with HKDF's default zero salt.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| KeystashError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// The 32-byte key derived from the master passphrase.
///
/// Zeroes its memory when dropped and never prints its bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Wrap raw key bytes.  The caller should zeroize its own copy.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Sub-key for the passphrase check value.
    pub fn check_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_check_key(&self.bytes)
    }

    /// Sub-key for the entry called `name`.
    pub fn entry_key(&self, name: &str) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        derive_entry_key(&self.bytes, name)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}
