//! Entry types stored inside a vault.
//!
//! An `Entry` holds the sealed secret together with its timestamps and
//! optional descriptive metadata (where the key came from, which login
//! it belongs to, whether it is still in use, when it expires).  The
//! metadata is stored in clear; only the secret itself is encrypted.

use chrono::{DateTime, Utc};

use crate::crypto::Sealed;
use crate::errors::{KeystashError, Result};

/// Longest accepted entry name, in bytes.
pub const MAX_NAME_LEN: usize = 256;

/// A single encrypted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Unique, case-sensitive name (e.g. "github").
    pub name: String,

    /// Nonce and ciphertext of the secret value.
    pub sealed: Sealed,

    /// When this entry was first added.
    pub created_at: DateTime<Utc>,

    /// When the value or metadata last changed.
    pub updated_at: DateTime<Utc>,

    pub metadata: EntryMetadata,
}

/// Descriptive, non-secret labels attached to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Where the secret came from (e.g. "github", "aws").
    pub source: Option<String>,
    /// Account or login the secret belongs to.
    pub login: Option<String>,
    /// Free-form batch label for keys issued together.
    pub batch: Option<String>,
    /// Inactive entries are kept but skipped by `next_usable`.
    pub active: bool,
    /// Optional expiry; expired entries are not usable.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            source: None,
            login: None,
            batch: None,
            active: true,
            expires_at: None,
        }
    }
}

/// Everything about an entry except its secret value.
///
/// Returned by `VaultStore::list` and `VaultStore::find` so callers can
/// display entries without decrypting anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: EntryMetadata,
}

impl EntryInfo {
    /// `true` once `now` has reached the entry's expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.metadata.expires_at.is_some_and(|at| at <= now)
    }

    /// Active and not expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.metadata.active && !self.is_expired(now)
    }
}

impl From<&Entry> for EntryInfo {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            metadata: entry.metadata.clone(),
        }
    }
}

/// Selects entries by metadata.  Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub source: Option<String>,
    pub login: Option<String>,
    pub batch: Option<String>,
    pub active: Option<bool>,
}

impl EntryFilter {
    /// Returns `true` if every set field equals the entry's value.
    pub fn matches(&self, metadata: &EntryMetadata) -> bool {
        fn field_matches(want: &Option<String>, have: &Option<String>) -> bool {
            want.as_ref().is_none_or(|w| have.as_ref() == Some(w))
        }

        field_matches(&self.source, &metadata.source)
            && field_matches(&self.login, &metadata.login)
            && field_matches(&self.batch, &metadata.batch)
            && self.active.is_none_or(|a| a == metadata.active)
    }
}

/// Entries that share their source, login and batch labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct UsageGroup {
    pub source: Option<String>,
    pub login: Option<String>,
    pub batch: Option<String>,
}

impl From<&EntryMetadata> for UsageGroup {
    fn from(metadata: &EntryMetadata) -> Self {
        Self {
            source: metadata.source.clone(),
            login: metadata.login.clone(),
            batch: metadata.batch.clone(),
        }
    }
}

/// How many entries of a group can still be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounts {
    pub usable: usize,
    pub unusable: usize,
}

/// Validate that an entry name is usable.
///
/// Names must be non-empty, at most 256 bytes and free of control
/// characters.  Comparison is case-sensitive.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KeystashError::InvalidName(
            "entry name cannot be empty".into(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(KeystashError::InvalidName(format!(
            "entry name cannot exceed {MAX_NAME_LEN} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(KeystashError::InvalidName(format!(
            "entry name {name:?} contains control characters"
        )));
    }
    Ok(())
}
