//! Cryptographic primitives for Keystash.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`cipher`)
//! - Argon2id password-based key derivation (`kdf`)
//! - The zeroizing session key and its HKDF sub-keys (`keys`)

pub mod cipher;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use cipher::{decrypt, encrypt, Sealed};
pub use kdf::{derive_key, generate_salt, KdfParams};
pub use keys::DerivedKey;
