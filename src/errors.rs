use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Keystash.
#[derive(Debug, Error)]
pub enum KeystashError {
    // --- Session errors ---
    #[error("Invalid passphrase — the vault could not be unlocked")]
    InvalidPassphrase,

    #[error("Vault is locked — unlock it before accessing entries")]
    NotUnlocked,

    // --- Container errors ---
    #[error("No vault found at {0}")]
    ContainerNotFound(PathBuf),

    #[error("A vault already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Malformed vault file: {0}")]
    MalformedContainer(String),

    #[error("Unsupported vault format version {0}")]
    UnsupportedVersion(u8),

    // --- Entry errors ---
    #[error("Entry '{0}' already exists (use `update` to change it)")]
    DuplicateName(String),

    #[error("Entry '{0}' not found")]
    NotFound(String),

    #[error("Invalid entry name: {0}")]
    InvalidName(String),

    #[error("Entry '{0}' is corrupted or has been tampered with")]
    CorruptEntry(String),

    // --- Crypto errors ---
    #[error("Authentication failed — ciphertext rejected")]
    AuthenticationFailed,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for Keystash results.
pub type Result<T> = std::result::Result<T, KeystashError>;
