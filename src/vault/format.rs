//! Binary container format.
//!
//! A `.vault` file has this layout:
//!
//! ```text
//! [KSTH: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][entries JSON]
//! ```
//!
//! - **Magic** (`KSTH`): identifies the file as a Keystash vault.
//! - **Version**: format version (currently `1`).  Any other value is
//!   rejected before the rest of the file is looked at.
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the entries JSON begins.
//! - **Header JSON**: salt, Argon2 params, creation time and the sealed
//!   passphrase check value.
//! - **Entries JSON**: array of entries sorted by name.
//!
//! Byte fields are standard base64 strings, timestamps are RFC 3339.
//! Entry ciphertexts are not authenticated here: a damaged entry only
//! fails when it is decrypted, and never takes its neighbours down.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::{validate_name, Entry, EntryMetadata};
use crate::crypto::cipher::NONCE_LEN;
use crate::crypto::kdf::{KdfParams, MIN_SALT_LEN};
use crate::crypto::Sealed;
use crate::errors::{KeystashError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"KSTH";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Cleartext vault metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultHeader {
    /// Argon2id salt.  Generated once at init, never regenerated.
    pub salt: Vec<u8>,

    /// Argon2id params used at init (every unlock reuses them).
    pub kdf: KdfParams,

    /// When this vault was first created.
    pub created_at: DateTime<Utc>,

    /// The sealed check value used to verify the passphrase.
    pub check: Sealed,
}

/// The whole persisted vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub format_version: u8,
    pub header: VaultHeader,
    pub entries: BTreeMap<String, Entry>,
}

impl Container {
    /// A container with no entries, at the current format version.
    pub fn new(header: VaultHeader) -> Self {
        Self {
            format_version: CURRENT_VERSION,
            header,
            entries: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct HeaderRecord {
    #[serde(with = "b64")]
    salt: Vec<u8>,
    kdf: KdfParams,
    created_at: DateTime<Utc>,
    check: SealedRecord,
}

#[derive(Serialize, Deserialize)]
struct SealedRecord {
    #[serde(with = "b64")]
    nonce: Vec<u8>,
    #[serde(with = "b64")]
    ciphertext: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct EntryRecord {
    name: String,
    #[serde(with = "b64")]
    nonce: Vec<u8>,
    #[serde(with = "b64")]
    ciphertext: Vec<u8>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch: Option<String>,
    active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl From<&Sealed> for SealedRecord {
    fn from(sealed: &Sealed) -> Self {
        Self {
            nonce: sealed.nonce.clone(),
            ciphertext: sealed.ciphertext.clone(),
        }
    }
}

impl From<SealedRecord> for Sealed {
    fn from(record: SealedRecord) -> Self {
        Self {
            nonce: record.nonce,
            ciphertext: record.ciphertext,
        }
    }
}

impl From<&Entry> for EntryRecord {
    fn from(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            nonce: entry.sealed.nonce.clone(),
            ciphertext: entry.sealed.ciphertext.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
            source: entry.metadata.source.clone(),
            login: entry.metadata.login.clone(),
            batch: entry.metadata.batch.clone(),
            active: entry.metadata.active,
            expires_at: entry.metadata.expires_at,
        }
    }
}

impl From<EntryRecord> for Entry {
    fn from(record: EntryRecord) -> Self {
        Self {
            name: record.name,
            sealed: Sealed {
                nonce: record.nonce,
                ciphertext: record.ciphertext,
            },
            created_at: record.created_at,
            updated_at: record.updated_at,
            metadata: EntryMetadata {
                source: record.source,
                login: record.login,
                batch: record.batch,
                active: record.active,
                expires_at: record.expires_at,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Serialize a container to bytes.
///
/// Output is deterministic: entries are written in name order.
pub fn encode(container: &Container) -> Result<Vec<u8>> {
    if container.format_version != CURRENT_VERSION {
        return Err(KeystashError::UnsupportedVersion(container.format_version));
    }

    let header = &container.header;
    let header_record = HeaderRecord {
        salt: header.salt.clone(),
        kdf: header.kdf,
        created_at: header.created_at,
        check: SealedRecord::from(&header.check),
    };
    let entry_records: Vec<EntryRecord> =
        container.entries.values().map(EntryRecord::from).collect();

    let header_bytes = serde_json::to_vec(&header_record)
        .map_err(|e| KeystashError::Serialization(format!("header: {e}")))?;
    let entries_bytes = serde_json::to_vec(&entry_records)
        .map_err(|e| KeystashError::Serialization(format!("entries: {e}")))?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        KeystashError::Serialization(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;

    let mut buf = Vec::with_capacity(PREFIX_LEN + header_bytes.len() + entries_bytes.len());
    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(container.format_version); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(&entries_bytes); // entries JSON

    Ok(buf)
}

/// Parse bytes produced by `encode`.
///
/// Fails closed: an unknown version is `UnsupportedVersion`, any
/// structural problem is `MalformedContainer`.  No partial result is
/// ever returned.
pub fn decode(data: &[u8]) -> Result<Container> {
    if data.len() < 4 || &data[0..4] != MAGIC {
        return Err(KeystashError::MalformedContainer(
            "missing KSTH magic bytes".into(),
        ));
    }

    let version = *data
        .get(4)
        .ok_or_else(|| KeystashError::MalformedContainer("missing version byte".into()))?;
    if version != CURRENT_VERSION {
        return Err(KeystashError::UnsupportedVersion(version));
    }

    if data.len() < PREFIX_LEN {
        return Err(KeystashError::MalformedContainer(
            "file too small to be a valid vault".into(),
        ));
    }

    let header_len_u32 = u32::from_le_bytes(
        data[5..9]
            .try_into()
            .map_err(|_| KeystashError::MalformedContainer("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        KeystashError::MalformedContainer(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            KeystashError::MalformedContainer("header length exceeds file size".into())
        })?;

    let header_record: HeaderRecord = serde_json::from_slice(&data[PREFIX_LEN..header_end])
        .map_err(|e| KeystashError::MalformedContainer(format!("header JSON: {e}")))?;
    let entry_records: Vec<EntryRecord> = serde_json::from_slice(&data[header_end..])
        .map_err(|e| KeystashError::MalformedContainer(format!("entries JSON: {e}")))?;

    if header_record.salt.len() < MIN_SALT_LEN {
        return Err(KeystashError::MalformedContainer(format!(
            "salt is {} bytes, expected at least {MIN_SALT_LEN}",
            header_record.salt.len()
        )));
    }
    header_record
        .kdf
        .validate()
        .map_err(|e| KeystashError::MalformedContainer(format!("header kdf: {e}")))?;
    if header_record.check.nonce.len() != NONCE_LEN {
        return Err(KeystashError::MalformedContainer(
            "check value nonce has the wrong length".into(),
        ));
    }

    let mut entries = BTreeMap::new();
    for record in entry_records {
        validate_name(&record.name)
            .map_err(|e| KeystashError::MalformedContainer(e.to_string()))?;
        if entries.contains_key(&record.name) {
            return Err(KeystashError::MalformedContainer(format!(
                "duplicate entry name {:?}",
                record.name
            )));
        }
        entries.insert(record.name.clone(), Entry::from(record));
    }

    Ok(Container {
        format_version: version,
        header: VaultHeader {
            salt: header_record.salt,
            kdf: header_record.kdf,
            created_at: header_record.created_at,
            check: header_record.check.into(),
        },
        entries,
    })
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

mod b64 {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&BASE64.encode(data))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(&s).map_err(serde::de::Error::custom)
    }
}
