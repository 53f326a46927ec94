//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  The parameters are recorded in the vault header
//! so every unlock reproduces exactly the same derivation.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::keys::{DerivedKey, KEY_LEN};
use crate::errors::{KeystashError, Result};

/// Length of a freshly generated salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Shortest salt accepted when deriving a key.
pub const MIN_SALT_LEN: usize = 16;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Largest memory cost accepted, in KiB (4 GiB).
pub const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Largest iteration count accepted.
pub const MAX_ITERATIONS: u32 = 64;

/// Largest number of lanes accepted.
pub const MAX_PARALLELISM: u32 = 64;

/// Argon2id work factor.
///
/// Stored verbatim in the vault header, so changing the defaults never
/// affects existing vaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Reject parameters too weak to be worth deriving with, or so
    /// expensive that deriving would hang or exhaust memory.
    ///
    /// Vault headers are not authenticated, so params read from a file
    /// go through this before any derivation.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Err(KeystashError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(KeystashError::KeyDerivationFailed(format!(
                "Argon2 iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(KeystashError::KeyDerivationFailed(format!(
                "Argon2 parallelism must be between 1 and {MAX_PARALLELISM} (got {})",
                self.parallelism
            )));
        }
        Ok(())
    }
}

/// Derive a 32-byte key from a passphrase and salt.
///
/// The same passphrase + salt + params always produce the same key.
/// Derivation cannot tell a wrong passphrase from a right one; the
/// vault's check value does that.
pub fn derive_key(passphrase: &[u8], salt: &[u8], kdf: &KdfParams) -> Result<DerivedKey> {
    kdf.validate()?;

    if salt.len() < MIN_SALT_LEN {
        return Err(KeystashError::KeyDerivationFailed(format!(
            "salt must be at least {MIN_SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }

    let params = Params::new(
        kdf.memory_kib,
        kdf.iterations,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KeystashError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut bytes = [0u8; KEY_LEN];
    let hashed = argon2
        .hash_password_into(passphrase, salt, &mut bytes)
        .map_err(|e| KeystashError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")));

    if let Err(e) = hashed {
        bytes.zeroize();
        return Err(e);
    }

    let key = DerivedKey::new(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
