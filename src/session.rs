//! Lock/unlock state machine around a single vault.
//!
//! A `SessionManager` is either **Locked** (no key, no entries in memory)
//! or **Unlocked** (owns a `VaultStore`, which owns the derived key).
//! Locking drops the store, and with it the zeroize-on-drop key.
//!
//! ```no_run
//! use keystash::SessionManager;
//!
//! # fn main() -> keystash::errors::Result<()> {
//! let mut session = SessionManager::new();
//! session.unlock("secrets.vault".as_ref(), b"correct horse")?;
//! let token = session.get("github")?;
//! session.lock();
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;
use zeroize::Zeroizing;

use crate::crypto::KdfParams;
use crate::errors::{KeystashError, Result};
use crate::vault::{EntryFilter, EntryInfo, EntryMetadata, UsageCounts, UsageGroup, VaultStore};

enum SessionState {
    Locked,
    Unlocked(VaultStore),
}

/// Holds the unlocked vault for the lifetime of a process.
pub struct SessionManager {
    state: SessionState,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// A new, locked session.
    pub fn new() -> Self {
        Self {
            state: SessionState::Locked,
        }
    }

    /// Create a vault at `path` with the default work factor and unlock it.
    pub fn init(&mut self, path: &Path, passphrase: &[u8]) -> Result<()> {
        self.init_with_params(path, passphrase, &KdfParams::default())
    }

    /// Create a vault at `path` with explicit Argon2 params and unlock it.
    ///
    /// Fails with `AlreadyExists` if anything is already at `path`.  Any
    /// vault unlocked before the call is locked first.
    pub fn init_with_params(
        &mut self,
        path: &Path,
        passphrase: &[u8],
        kdf: &KdfParams,
    ) -> Result<()> {
        self.lock();
        let store = VaultStore::create(path, passphrase, kdf)?;
        self.state = SessionState::Unlocked(store);
        Ok(())
    }

    /// Open the vault at `path`.  On any failure the session stays locked.
    pub fn unlock(&mut self, path: &Path, passphrase: &[u8]) -> Result<()> {
        self.lock();
        let store = VaultStore::open(path, passphrase)?;
        info!(path = %path.display(), "session unlocked");
        self.state = SessionState::Unlocked(store);
        Ok(())
    }

    /// Drop the in-memory vault and key.  Always succeeds.
    pub fn lock(&mut self) {
        if let SessionState::Unlocked(store) =
            std::mem::replace(&mut self.state, SessionState::Locked)
        {
            info!(path = %store.path().display(), "session locked");
        }
    }

    /// `true` while a vault is unlocked.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, SessionState::Unlocked(_))
    }

    /// The unlocked vault, or `NotUnlocked`.
    pub fn vault(&self) -> Result<&VaultStore> {
        match &self.state {
            SessionState::Unlocked(store) => Ok(store),
            SessionState::Locked => Err(KeystashError::NotUnlocked),
        }
    }

    /// The unlocked vault for mutation, or `NotUnlocked`.
    pub fn vault_mut(&mut self) -> Result<&mut VaultStore> {
        match &mut self.state {
            SessionState::Unlocked(store) => Ok(store),
            SessionState::Locked => Err(KeystashError::NotUnlocked),
        }
    }

    // ------------------------------------------------------------------
    // Entry operations (all require an unlocked session)
    // ------------------------------------------------------------------

    pub fn add(&mut self, name: &str, secret: &str) -> Result<()> {
        self.vault_mut()?.add(name, secret)
    }

    pub fn add_with(&mut self, name: &str, secret: &str, metadata: EntryMetadata) -> Result<()> {
        self.vault_mut()?.add_with(name, secret, metadata)
    }

    pub fn get(&self, name: &str) -> Result<Zeroizing<String>> {
        self.vault()?.get(name)
    }

    pub fn update(&mut self, name: &str, secret: &str) -> Result<()> {
        self.vault_mut()?.update(name, secret)
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.vault_mut()?.remove(name)
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> Result<()> {
        self.vault_mut()?.set_active(name, active)
    }

    pub fn set_metadata(&mut self, name: &str, metadata: EntryMetadata) -> Result<()> {
        self.vault_mut()?.set_metadata(name, metadata)
    }

    pub fn remove_matching(&mut self, filter: &EntryFilter) -> Result<usize> {
        self.vault_mut()?.remove_matching(filter)
    }

    pub fn list(&self) -> Result<Vec<EntryInfo>> {
        Ok(self.vault()?.list())
    }

    pub fn find(&self, filter: &EntryFilter) -> Result<Vec<EntryInfo>> {
        Ok(self.vault()?.find(filter))
    }

    pub fn next_usable(&self, filter: &EntryFilter, now: DateTime<Utc>) -> Result<Option<EntryInfo>> {
        Ok(self.vault()?.next_usable(filter, now))
    }

    pub fn usability_counts(
        &self,
        filter: &EntryFilter,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<UsageGroup, UsageCounts>> {
        Ok(self.vault()?.usability_counts(filter, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_locked() {
        let session = SessionManager::default();
        assert!(!session.is_unlocked());
        assert!(matches!(session.vault(), Err(KeystashError::NotUnlocked)));
    }

    #[test]
    fn locked_session_rejects_every_operation() {
        let mut session = SessionManager::new();
        assert!(matches!(session.add("a", "b"), Err(KeystashError::NotUnlocked)));
        assert!(matches!(session.get("a"), Err(KeystashError::NotUnlocked)));
        assert!(matches!(session.update("a", "b"), Err(KeystashError::NotUnlocked)));
        assert!(matches!(session.remove("a"), Err(KeystashError::NotUnlocked)));
        assert!(matches!(session.list(), Err(KeystashError::NotUnlocked)));
        assert!(matches!(
            session.set_active("a", false),
            Err(KeystashError::NotUnlocked)
        ));
        assert!(matches!(
            session.find(&EntryFilter::default()),
            Err(KeystashError::NotUnlocked)
        ));
        assert!(matches!(
            session.set_metadata("a", EntryMetadata::default()),
            Err(KeystashError::NotUnlocked)
        ));
        assert!(matches!(
            session.remove_matching(&EntryFilter::default()),
            Err(KeystashError::NotUnlocked)
        ));
        assert!(matches!(
            session.usability_counts(&EntryFilter::default(), Utc::now()),
            Err(KeystashError::NotUnlocked)
        ));
    }

    #[test]
    fn lock_is_idempotent() {
        let mut session = SessionManager::new();
        session.lock();
        session.lock();
        assert!(!session.is_unlocked());
    }
}
