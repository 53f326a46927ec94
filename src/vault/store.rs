//! High-level vault operations.
//!
//! `VaultStore` wraps the container format and the crypto layer so the
//! session (and through it the CLI) can work with plain calls like
//! `store.add("github", "ghp_...")`.
//!
//! Every mutation is persisted immediately.  If persisting fails the
//! in-memory change is undone, so memory and disk never disagree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::cipher::{decrypt, encrypt};
use crate::crypto::kdf::{derive_key, generate_salt, KdfParams};
use crate::crypto::keys::DerivedKey;
use crate::errors::{KeystashError, Result};

use super::entry::{
    validate_name, Entry, EntryFilter, EntryInfo, EntryMetadata, UsageCounts, UsageGroup,
};
use super::format::{self, Container, VaultHeader};
use super::storage;

/// Known plaintext sealed at init; decrypting it proves the passphrase.
const CHECK_PLAINTEXT: &[u8] = b"keystash-check-v1";

/// An unlocked vault: the decoded container plus the key that opens it.
pub struct VaultStore {
    /// Path to the `.vault` file on disk.
    path: PathBuf,

    container: Container,

    /// Zeroized on drop.
    key: DerivedKey,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a brand-new vault file at `path`.
    ///
    /// Generates a random salt, derives the key from the passphrase,
    /// seals the check value and writes an empty vault to disk.
    pub fn create(path: &Path, passphrase: &[u8], kdf: &KdfParams) -> Result<Self> {
        if path.exists() {
            return Err(KeystashError::AlreadyExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let salt = generate_salt();
        let key = derive_key(passphrase, &salt, kdf)?;

        let check = {
            let check_key = key.check_key()?;
            encrypt(check_key.as_slice(), CHECK_PLAINTEXT)?
        };

        let header = VaultHeader {
            salt: salt.to_vec(),
            kdf: *kdf,
            created_at: Utc::now(),
            check,
        };

        let store = Self {
            path: path.to_path_buf(),
            container: Container::new(header),
            key,
        };
        store.save()?;

        info!(path = %path.display(), "vault created");
        Ok(store)
    }

    /// Open an existing vault file and verify the passphrase.
    ///
    /// Decoding happens before any key derivation, so a malformed or
    /// unsupported file is reported as such rather than as a wrong
    /// passphrase.
    pub fn open(path: &Path, passphrase: &[u8]) -> Result<Self> {
        if !path.exists() {
            return Err(KeystashError::ContainerNotFound(path.to_path_buf()));
        }

        let bytes = storage::read(path)?;
        let container = format::decode(&bytes)?;

        let header = &container.header;
        let key = derive_key(passphrase, &header.salt, &header.kdf)?;
        verify_check_value(&key, header)?;

        debug!(
            path = %path.display(),
            entries = container.entries.len(),
            "vault unlocked"
        );

        Ok(Self {
            path: path.to_path_buf(),
            container,
            key,
        })
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Add a new entry with default metadata.
    pub fn add(&mut self, name: &str, secret: &str) -> Result<()> {
        self.add_with(name, secret, EntryMetadata::default())
    }

    /// Add a new entry with the given metadata.
    pub fn add_with(&mut self, name: &str, secret: &str, metadata: EntryMetadata) -> Result<()> {
        validate_name(name)?;
        if self.container.entries.contains_key(name) {
            return Err(KeystashError::DuplicateName(name.to_string()));
        }

        let sealed = self.seal(name, secret)?;
        let now = Utc::now();
        let entry = Entry {
            name: name.to_string(),
            sealed,
            created_at: now,
            updated_at: now,
            metadata,
        };

        self.container.entries.insert(name.to_string(), entry);
        if let Err(e) = self.save() {
            self.container.entries.remove(name);
            return Err(e);
        }

        debug!(entry = name, "entry added");
        Ok(())
    }

    /// Decrypt and return the secret value of an entry.
    pub fn get(&self, name: &str) -> Result<Zeroizing<String>> {
        let entry = self
            .container
            .entries
            .get(name)
            .ok_or_else(|| KeystashError::NotFound(name.to_string()))?;

        let entry_key = self.key.entry_key(name)?;
        let plaintext = decrypt(entry_key.as_slice(), &entry.sealed)
            .map_err(|_| KeystashError::CorruptEntry(name.to_string()))?;

        // from_utf8 takes ownership (no copy); wipe the bytes on failure.
        String::from_utf8(plaintext).map(Zeroizing::new).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            KeystashError::CorruptEntry(name.to_string())
        })
    }

    /// Replace the secret value of an existing entry.
    ///
    /// Re-encrypts under a fresh nonce and keeps `created_at`.
    pub fn update(&mut self, name: &str, secret: &str) -> Result<()> {
        if !self.container.entries.contains_key(name) {
            return Err(KeystashError::NotFound(name.to_string()));
        }

        let sealed = self.seal(name, secret)?;
        self.modify(name, |entry| entry.sealed = sealed)?;

        debug!(entry = name, "entry updated");
        Ok(())
    }

    /// Mark an entry active or inactive.
    pub fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        self.modify(name, |entry| entry.metadata.active = active)?;

        debug!(entry = name, active, "entry activity changed");
        Ok(())
    }

    /// Replace an entry's metadata (labels, active flag, expiry).  The
    /// secret and `created_at` are kept.
    pub fn set_metadata(&mut self, name: &str, metadata: EntryMetadata) -> Result<()> {
        self.modify(name, |entry| entry.metadata = metadata)?;

        debug!(entry = name, "entry metadata changed");
        Ok(())
    }

    /// Remove an entry from the vault.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let removed = self
            .container
            .entries
            .remove(name)
            .ok_or_else(|| KeystashError::NotFound(name.to_string()))?;

        if let Err(e) = self.save() {
            self.container.entries.insert(name.to_string(), removed);
            return Err(e);
        }

        debug!(entry = name, "entry removed");
        Ok(())
    }

    /// Remove every entry matching `filter` with a single save.
    ///
    /// Returns how many entries were removed.  An empty filter matches
    /// everything.  If saving fails, nothing is removed.
    pub fn remove_matching(&mut self, filter: &EntryFilter) -> Result<usize> {
        let names: Vec<String> = self
            .container
            .entries
            .values()
            .filter(|e| filter.matches(&e.metadata))
            .map(|e| e.name.clone())
            .collect();
        if names.is_empty() {
            return Ok(0);
        }

        let removed: Vec<Entry> = names
            .iter()
            .filter_map(|name| self.container.entries.remove(name))
            .collect();

        if let Err(e) = self.save() {
            for entry in removed {
                self.container.entries.insert(entry.name.clone(), entry);
            }
            return Err(e);
        }

        debug!(count = removed.len(), "matching entries removed");
        Ok(removed.len())
    }

    /// Metadata for all entries, sorted by name.  Nothing is decrypted.
    pub fn list(&self) -> Vec<EntryInfo> {
        self.container.entries.values().map(EntryInfo::from).collect()
    }

    /// Metadata for the entries matching `filter`, sorted by name.
    pub fn find(&self, filter: &EntryFilter) -> Vec<EntryInfo> {
        self.container
            .entries
            .values()
            .filter(|e| filter.matches(&e.metadata))
            .map(EntryInfo::from)
            .collect()
    }

    /// The matching entry that should be used next.
    ///
    /// Only active, unexpired entries qualify.  The one expiring soonest
    /// wins; entries without an expiry come last, ties go by name.
    pub fn next_usable(&self, filter: &EntryFilter, now: DateTime<Utc>) -> Option<EntryInfo> {
        self.find(filter)
            .into_iter()
            .filter(|info| info.is_usable(now))
            .min_by(|a, b| {
                let a_key = (a.metadata.expires_at.is_none(), a.metadata.expires_at);
                let b_key = (b.metadata.expires_at.is_none(), b.metadata.expires_at);
                a_key.cmp(&b_key).then_with(|| a.name.cmp(&b.name))
            })
    }

    /// Usable and unusable entry counts per (source, login, batch) group,
    /// over the entries matching `filter`.
    pub fn usability_counts(
        &self,
        filter: &EntryFilter,
        now: DateTime<Utc>,
    ) -> BTreeMap<UsageGroup, UsageCounts> {
        let mut counts: BTreeMap<UsageGroup, UsageCounts> = BTreeMap::new();
        for info in self.find(filter) {
            let tally = counts.entry(UsageGroup::from(&info.metadata)).or_default();
            if info.is_usable(now) {
                tally.usable += 1;
            } else {
                tally.unusable += 1;
            }
        }
        counts
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encode the whole container and replace the file atomically.
    fn save(&self) -> Result<()> {
        let bytes = format::encode(&self.container)?;
        storage::write_atomic(&self.path, &bytes)
    }

    /// Seal `secret` under the sub-key for `name`.
    fn seal(&self, name: &str, secret: &str) -> Result<crate::crypto::Sealed> {
        let entry_key = self.key.entry_key(name)?;
        encrypt(entry_key.as_slice(), secret.as_bytes())
    }

    /// Apply `change` to an entry, bump `updated_at` and persist.  The
    /// previous entry is restored if persisting fails.
    fn modify<F>(&mut self, name: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut Entry),
    {
        let entry = self
            .container
            .entries
            .get_mut(name)
            .ok_or_else(|| KeystashError::NotFound(name.to_string()))?;

        let previous = entry.clone();
        change(entry);
        entry.updated_at = Utc::now();

        if let Err(e) = self.save() {
            self.container.entries.insert(name.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of entries in the vault.
    pub fn len(&self) -> usize {
        self.container.entries.len()
    }

    /// Returns `true` if the vault has no entries.
    pub fn is_empty(&self) -> bool {
        self.container.entries.is_empty()
    }

    /// Returns `true` if the vault contains an entry with the given name.
    ///
    /// This is a metadata-only check — no decryption is performed.
    pub fn contains(&self, name: &str) -> bool {
        self.container.entries.contains_key(name)
    }

    /// Returns the vault creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.container.header.created_at
    }

    /// Returns the Argon2 params the vault was created with.
    pub fn kdf_params(&self) -> KdfParams {
        self.container.header.kdf
    }
}

/// Open the check value; any failure means the passphrase was wrong.
fn verify_check_value(key: &DerivedKey, header: &VaultHeader) -> Result<()> {
    let check_key = key.check_key()?;
    let plaintext = Zeroizing::new(
        decrypt(check_key.as_slice(), &header.check)
            .map_err(|_| KeystashError::InvalidPassphrase)?,
    );

    if bool::from(plaintext.as_slice().ct_eq(CHECK_PLAINTEXT)) {
        Ok(())
    } else {
        Err(KeystashError::InvalidPassphrase)
    }
}
