//! Integration tests for the Keystash vault module.

use std::fs;

use chrono::{Duration, Utc};
use keystash::crypto::KdfParams;
use keystash::vault::{self, EntryFilter, EntryMetadata, UsageCounts, UsageGroup, VaultStore};
use keystash::KeystashError;
use tempfile::TempDir;

/// Fast Argon2 params so the test suite stays quick.
fn fast() -> KdfParams {
    KdfParams {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

/// Helper: create a temporary vault file path inside a fresh temp dir.
fn vault_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.vault");
    (dir, path)
}

/// Decode the file, let `tamper` change it, and write it back.
fn rewrite(path: &std::path::Path, tamper: impl FnOnce(&mut vault::Container)) {
    let mut container = vault::decode(&fs::read(path).unwrap()).unwrap();
    tamper(&mut container);
    fs::write(path, vault::encode(&container).unwrap()).unwrap();
}

// ---------------------------------------------------------------------------
// Create and re-open round-trip
// ---------------------------------------------------------------------------

#[test]
fn create_vault_and_reopen() {
    let (_dir, path) = vault_path();

    let mut store = VaultStore::create(&path, b"pw1", &fast()).expect("create vault");
    store.add("github", "ghp_abc").unwrap();
    drop(store);

    let store = VaultStore::open(&path, b"pw1").expect("open vault");
    assert_eq!(store.len(), 1);
    assert_eq!(store.kdf_params(), fast());
    assert_eq!(store.get("github").unwrap().as_str(), "ghp_abc");
}

#[test]
fn every_mutation_is_persisted_immediately() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    store.add("a", "1").unwrap();
    assert!(VaultStore::open(&path, b"pw").unwrap().contains("a"));

    store.update("a", "2").unwrap();
    assert_eq!(*VaultStore::open(&path, b"pw").unwrap().get("a").unwrap(), "2");

    store.set_active("a", false).unwrap();
    let reopened = VaultStore::open(&path, b"pw").unwrap();
    assert!(!reopened.list()[0].metadata.active);

    store.remove("a").unwrap();
    assert!(VaultStore::open(&path, b"pw").unwrap().is_empty());
}

#[test]
fn salt_is_never_regenerated() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    let salt = vault::decode(&fs::read(&path).unwrap()).unwrap().header.salt;

    store.add("a", "1").unwrap();
    store.update("a", "2").unwrap();
    store.remove("a").unwrap();

    let after = vault::decode(&fs::read(&path).unwrap()).unwrap().header.salt;
    assert_eq!(salt, after);
}

// ---------------------------------------------------------------------------
// CRUD preconditions
// ---------------------------------------------------------------------------

#[test]
fn duplicate_add_fails_and_leaves_vault_unchanged() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("k", "v1").unwrap();
    let on_disk = fs::read(&path).unwrap();

    let result = store.add("k", "v2");
    assert!(matches!(result, Err(KeystashError::DuplicateName(n)) if n == "k"));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("k").unwrap().as_str(), "v1");
    assert_eq!(fs::read(&path).unwrap(), on_disk);
}

#[test]
fn names_are_case_sensitive() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    store.add("Token", "upper").unwrap();
    store.add("token", "lower").unwrap();

    assert_eq!(store.get("Token").unwrap().as_str(), "upper");
    assert_eq!(store.get("token").unwrap().as_str(), "lower");
}

#[test]
fn missing_entries_are_not_found() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    let on_disk = fs::read(&path).unwrap();

    assert!(matches!(store.get("nope"), Err(KeystashError::NotFound(_))));
    assert!(matches!(store.update("nope", "v"), Err(KeystashError::NotFound(_))));
    assert!(matches!(store.remove("nope"), Err(KeystashError::NotFound(_))));
    assert!(matches!(
        store.set_active("nope", false),
        Err(KeystashError::NotFound(_))
    ));
    assert!(matches!(
        store.set_metadata("nope", EntryMetadata::default()),
        Err(KeystashError::NotFound(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), on_disk);
}

#[test]
fn lookups_of_names_that_cannot_exist_are_not_found() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    assert!(matches!(store.get(""), Err(KeystashError::NotFound(_))));
    assert!(matches!(store.update("", "v"), Err(KeystashError::NotFound(_))));
    assert!(matches!(store.remove("a\0b"), Err(KeystashError::NotFound(_))));
    assert!(matches!(
        store.set_active("", true),
        Err(KeystashError::NotFound(_))
    ));
}

#[test]
fn invalid_names_are_rejected() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    assert!(matches!(store.add("", "v"), Err(KeystashError::InvalidName(_))));
    assert!(matches!(store.add("a\0b", "v"), Err(KeystashError::InvalidName(_))));
    assert!(store.is_empty());
}

#[test]
fn update_refreshes_nonce_and_keeps_created_at() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("k", "same").unwrap();
    let before = vault::decode(&fs::read(&path).unwrap()).unwrap().entries["k"].clone();

    store.update("k", "same").unwrap();
    let after = vault::decode(&fs::read(&path).unwrap()).unwrap().entries["k"].clone();

    assert_ne!(before.sealed.nonce, after.sealed.nonce);
    assert_eq!(before.created_at, after.created_at);
    assert!(after.updated_at >= before.updated_at);
}

#[test]
fn list_returns_sorted_metadata_without_values() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("zebra", "z").unwrap();
    store.add("alpha", "a").unwrap();
    store.add("middle", "m").unwrap();

    let names: Vec<_> = store.list().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["alpha", "middle", "zebra"]);
}

// ---------------------------------------------------------------------------
// Open failures
// ---------------------------------------------------------------------------

#[test]
fn wrong_passphrase_is_rejected() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"correct", &fast()).unwrap();
    store.add("k", "v").unwrap();

    let result = VaultStore::open(&path, b"wrong");
    assert!(matches!(result, Err(KeystashError::InvalidPassphrase)));
}

#[test]
fn tampered_check_value_reads_as_wrong_passphrase() {
    let (_dir, path) = vault_path();
    VaultStore::create(&path, b"pw", &fast()).unwrap();

    rewrite(&path, |c| c.header.check.ciphertext[0] ^= 0x01);

    assert!(matches!(
        VaultStore::open(&path, b"pw"),
        Err(KeystashError::InvalidPassphrase)
    ));
}

#[test]
fn create_vault_twice_fails() {
    let (_dir, path) = vault_path();
    VaultStore::create(&path, b"pw", &fast()).unwrap();
    let original = fs::read(&path).unwrap();

    let result = VaultStore::create(&path, b"pw", &fast());
    assert!(matches!(result, Err(KeystashError::AlreadyExists(_))));
    assert_eq!(fs::read(&path).unwrap(), original);
}

#[test]
fn open_nonexistent_vault_fails() {
    let (_dir, path) = vault_path();
    assert!(matches!(
        VaultStore::open(&path, b"pw"),
        Err(KeystashError::ContainerNotFound(_))
    ));
}

#[test]
fn garbage_file_is_malformed() {
    let (_dir, path) = vault_path();
    fs::write(&path, b"definitely not a vault").unwrap();

    assert!(matches!(
        VaultStore::open(&path, b"pw"),
        Err(KeystashError::MalformedContainer(_))
    ));
}

#[test]
fn truncated_file_is_malformed() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("k", "v").unwrap();

    let data = fs::read(&path).unwrap();
    fs::write(&path, &data[..data.len() / 2]).unwrap();

    assert!(matches!(
        VaultStore::open(&path, b"pw"),
        Err(KeystashError::MalformedContainer(_))
    ));
}

#[test]
fn future_version_fails_closed() {
    let (_dir, path) = vault_path();
    VaultStore::create(&path, b"pw", &fast()).unwrap();

    let mut data = fs::read(&path).unwrap();
    data[4] = vault::CURRENT_VERSION + 1;
    fs::write(&path, &data).unwrap();

    assert!(matches!(
        VaultStore::open(&path, b"pw"),
        Err(KeystashError::UnsupportedVersion(v)) if v == vault::CURRENT_VERSION + 1
    ));
}

#[test]
fn runaway_kdf_params_in_header_fail_closed() {
    let cases: [fn(&mut KdfParams); 3] = [
        |kdf| kdf.iterations = u32::MAX,
        |kdf| kdf.memory_kib = u32::MAX,
        |kdf| kdf.parallelism = 0,
    ];

    for tamper in cases {
        let (_dir, path) = vault_path();
        VaultStore::create(&path, b"pw", &fast()).unwrap();

        rewrite(&path, |c| tamper(&mut c.header.kdf));
        assert!(matches!(
            VaultStore::open(&path, b"pw"),
            Err(KeystashError::MalformedContainer(_))
        ));
    }
}

// ---------------------------------------------------------------------------
// Tamper detection is per entry
// ---------------------------------------------------------------------------

#[test]
fn flipped_ciphertext_bit_only_breaks_that_entry() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("victim", "secret-1").unwrap();
    store.add("bystander", "secret-2").unwrap();
    drop(store);

    rewrite(&path, |c| {
        let entry = c.entries.get_mut("victim").unwrap();
        entry.sealed.ciphertext[3] ^= 0x10;
    });

    let store = VaultStore::open(&path, b"pw").expect("vault still opens");
    assert!(matches!(
        store.get("victim"),
        Err(KeystashError::CorruptEntry(n)) if n == "victim"
    ));
    assert_eq!(store.get("bystander").unwrap().as_str(), "secret-2");
    assert_eq!(store.list().len(), 2);
}

#[test]
fn flipped_nonce_bit_is_corrupt_entry() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("victim", "secret").unwrap();
    drop(store);

    rewrite(&path, |c| {
        let entry = c.entries.get_mut("victim").unwrap();
        entry.sealed.nonce[0] ^= 0x80;
    });

    let store = VaultStore::open(&path, b"pw").unwrap();
    assert!(matches!(
        store.get("victim"),
        Err(KeystashError::CorruptEntry(_))
    ));
}

#[test]
fn truncated_nonce_is_corrupt_entry() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("victim", "secret").unwrap();
    drop(store);

    rewrite(&path, |c| {
        c.entries.get_mut("victim").unwrap().sealed.nonce.truncate(5);
    });

    let store = VaultStore::open(&path, b"pw").unwrap();
    assert!(matches!(
        store.get("victim"),
        Err(KeystashError::CorruptEntry(_))
    ));
}

// ---------------------------------------------------------------------------
// Atomic persistence
// ---------------------------------------------------------------------------

#[test]
fn interrupted_write_leaves_file_byte_identical() {
    let (dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("k", "v").unwrap();
    let before = fs::read(&path).unwrap();

    let mut container = vault::decode(&before).unwrap();
    container.entries.clear();
    let next = vault::encode(&container).unwrap();

    let result = vault::storage::write_atomic_with(&path, &next, |_| {
        Err(KeystashError::CommandFailed("power lost".into()))
    });

    assert!(result.is_err());
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(*VaultStore::open(&path, b"pw").unwrap().get("k").unwrap(), "v");
}

#[test]
fn saves_leave_no_temp_files_behind() {
    let (dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    for i in 0..5 {
        store.add(&format!("k{i}"), "v").unwrap();
    }

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

// ---------------------------------------------------------------------------
// Metadata, filters and selection
// ---------------------------------------------------------------------------

#[test]
fn metadata_roundtrips_through_disk() {
    let (_dir, path) = vault_path();
    let expires = Utc::now() + Duration::days(30);
    let meta = EntryMetadata {
        source: Some("github".into()),
        login: Some("ci-bot".into()),
        batch: Some("2024-06".into()),
        active: true,
        expires_at: Some(expires),
    };

    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add_with("gh-ci", "ghp_1", meta.clone()).unwrap();
    drop(store);

    let store = VaultStore::open(&path, b"pw").unwrap();
    assert_eq!(store.list()[0].metadata, meta);
}

#[test]
fn find_filters_by_labels_and_activity() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    let gh = |login: &str, active: bool| EntryMetadata {
        source: Some("github".into()),
        login: Some(login.into()),
        active,
        ..EntryMetadata::default()
    };
    store.add_with("gh-a", "1", gh("alice", true)).unwrap();
    store.add_with("gh-b", "2", gh("bob", false)).unwrap();
    store.add("plain", "3").unwrap();

    let github = EntryFilter {
        source: Some("github".into()),
        ..EntryFilter::default()
    };
    assert_eq!(store.find(&github).len(), 2);

    let active_github = EntryFilter {
        active: Some(true),
        ..github.clone()
    };
    let found = store.find(&active_github);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "gh-a");

    assert_eq!(store.find(&EntryFilter::default()).len(), 3);
}

#[test]
fn next_usable_prefers_soonest_expiry() {
    let (_dir, path) = vault_path();
    let now = Utc::now();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    let expiring = |days: i64| EntryMetadata {
        source: Some("openai".into()),
        expires_at: Some(now + Duration::days(days)),
        ..EntryMetadata::default()
    };
    store.add_with("later", "1", expiring(30)).unwrap();
    store.add_with("sooner", "2", expiring(3)).unwrap();
    store.add_with("expired", "3", expiring(-1)).unwrap();
    store
        .add_with(
            "forever",
            "4",
            EntryMetadata {
                source: Some("openai".into()),
                ..EntryMetadata::default()
            },
        )
        .unwrap();

    let filter = EntryFilter {
        source: Some("openai".into()),
        ..EntryFilter::default()
    };
    assert_eq!(store.next_usable(&filter, now).unwrap().name, "sooner");

    store.set_active("sooner", false).unwrap();
    assert_eq!(store.next_usable(&filter, now).unwrap().name, "later");

    store.remove("later").unwrap();
    assert_eq!(store.next_usable(&filter, now).unwrap().name, "forever");

    store.remove("forever").unwrap();
    assert!(store.next_usable(&filter, now).is_none());
}

#[test]
fn set_metadata_relabels_and_keeps_the_secret() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store
        .add_with(
            "gh",
            "ghp_1",
            EntryMetadata {
                source: Some("gitlab".into()),
                ..EntryMetadata::default()
            },
        )
        .unwrap();
    let created = store.list()[0].created_at;

    let fixed = EntryMetadata {
        source: Some("github".into()),
        login: Some("ci-bot".into()),
        batch: Some("2024-06".into()),
        active: true,
        expires_at: Some(Utc::now() + Duration::days(7)),
    };
    store.set_metadata("gh", fixed.clone()).unwrap();
    drop(store);

    let store = VaultStore::open(&path, b"pw").unwrap();
    let info = &store.list()[0];
    assert_eq!(info.metadata, fixed);
    assert_eq!(info.created_at, created);
    assert_eq!(store.get("gh").unwrap().as_str(), "ghp_1");
}

#[test]
fn usability_counts_group_by_labels() {
    let (_dir, path) = vault_path();
    let now = Utc::now();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    let meta = |source: &str, login: &str, active: bool, expires_in: Option<i64>| EntryMetadata {
        source: Some(source.into()),
        login: Some(login.into()),
        active,
        expires_at: expires_in.map(|d| now + Duration::days(d)),
        ..EntryMetadata::default()
    };
    store.add_with("a1", "1", meta("openai", "alice", true, None)).unwrap();
    store.add_with("a2", "2", meta("openai", "alice", false, None)).unwrap();
    store.add_with("a3", "3", meta("openai", "alice", true, Some(-1))).unwrap();
    store.add_with("b1", "4", meta("openai", "bob", true, Some(5))).unwrap();
    store.add_with("g1", "5", meta("github", "alice", true, None)).unwrap();

    let group = |source: &str, login: &str| UsageGroup {
        source: Some(source.into()),
        login: Some(login.into()),
        batch: None,
    };

    let all = store.usability_counts(&EntryFilter::default(), now);
    assert_eq!(all.len(), 3);
    assert_eq!(
        all[&group("openai", "alice")],
        UsageCounts {
            usable: 1,
            unusable: 2
        }
    );
    assert_eq!(
        all[&group("openai", "bob")],
        UsageCounts {
            usable: 1,
            unusable: 0
        }
    );

    let openai = EntryFilter {
        source: Some("openai".into()),
        ..EntryFilter::default()
    };
    let counts = store.usability_counts(&openai, now);
    assert_eq!(counts.len(), 2);
    assert!(!counts.contains_key(&group("github", "alice")));
}

#[test]
fn remove_matching_deletes_with_one_save() {
    let (dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();

    let batch = |b: &str| EntryMetadata {
        batch: Some(b.into()),
        ..EntryMetadata::default()
    };
    store.add_with("old-1", "1", batch("2023")).unwrap();
    store.add_with("old-2", "2", batch("2023")).unwrap();
    store.add_with("new-1", "3", batch("2024")).unwrap();

    let stale = EntryFilter {
        batch: Some("2023".into()),
        ..EntryFilter::default()
    };
    assert_eq!(store.remove_matching(&stale).unwrap(), 2);
    assert_eq!(store.remove_matching(&stale).unwrap(), 0);
    drop(store);

    let store = VaultStore::open(&path, b"pw").unwrap();
    let names: Vec<_> = store.list().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["new-1"]);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn remove_matching_nothing_leaves_file_untouched() {
    let (_dir, path) = vault_path();
    let mut store = VaultStore::create(&path, b"pw", &fast()).unwrap();
    store.add("k", "v").unwrap();
    let on_disk = fs::read(&path).unwrap();

    let none = EntryFilter {
        source: Some("nowhere".into()),
        ..EntryFilter::default()
    };
    assert_eq!(store.remove_matching(&none).unwrap(), 0);
    assert_eq!(fs::read(&path).unwrap(), on_disk);
}
