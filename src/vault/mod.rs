//! Vault module — encrypted entry storage.
//!
//! This module provides:
//! - `Entry`, `EntryInfo` and metadata filter types (`entry`)
//! - The versioned binary container codec (`format`)
//! - Atomic temp-file + rename persistence (`storage`)
//! - `VaultStore`, the unlocked vault with its CRUD operations (`store`)

pub mod entry;
pub mod format;
pub mod storage;
pub mod store;

// Re-export the most commonly used items.
pub use entry::{Entry, EntryFilter, EntryInfo, EntryMetadata, UsageCounts, UsageGroup};
pub use format::{decode, encode, Container, VaultHeader, CURRENT_VERSION};
pub use store::VaultStore;
