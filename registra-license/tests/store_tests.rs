mod common;

use common::{issue_unlimited, issuer_keystore};
use registra_license::{
    FileStore, IssueOptions, Issuer, LicenseError, LicenseStatus, LicenseStore, MachineIdentity,
    MemoryStore,
};

fn machine() -> MachineIdentity {
    MachineIdentity::normalize("AABBCCDDEEFF").unwrap()
}

// ── MemoryStore ──────────────────────────────────────────────────

#[test]
fn put_then_get() {
    let store = MemoryStore::new();
    let license = issue_unlimited(&issuer_keystore());
    store.put(license.clone()).unwrap();
    let fetched = store.get(&license.license_key).unwrap().unwrap();
    assert_eq!(fetched, license);
}

#[test]
fn get_unknown_is_none() {
    let store = MemoryStore::new();
    assert!(store.get("XXXXX-XXXXX").unwrap().is_none());
}

#[test]
fn activation_increments_and_marks_active() {
    let store = MemoryStore::new();
    let license = issue_unlimited(&issuer_keystore());
    store.put(license.clone()).unwrap();

    let updated = store.activate(&license.license_key, &machine()).unwrap();
    assert_eq!(updated.activation_count, 1);
    assert_eq!(updated.status, LicenseStatus::Active);
}

#[test]
fn activation_of_unknown_key_fails() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.activate("XXXXX-XXXXX", &machine()),
        Err(LicenseError::UnknownKey(_))
    ));
}

#[test]
fn device_cap_rejected_without_increment() {
    let ks = issuer_keystore();
    let store = MemoryStore::new();
    let license = Issuer::new(&ks)
        .issue(IssueOptions {
            max_devices: 2,
            ..IssueOptions::default()
        })
        .unwrap();
    store.put(license.clone()).unwrap();

    store.activate(&license.license_key, &machine()).unwrap();
    store.activate(&license.license_key, &machine()).unwrap();

    let result = store.activate(&license.license_key, &machine());
    assert!(matches!(result, Err(LicenseError::DeviceLimitExceeded(2))));

    // The rejected attempt must not consume a binding event
    let record = store.get(&license.license_key).unwrap().unwrap();
    assert_eq!(record.activation_count, 2);
}

#[test]
fn revoked_license_cannot_activate() {
    let store = MemoryStore::new();
    let mut license = issue_unlimited(&issuer_keystore());
    license.status = LicenseStatus::Revoked;
    store.put(license.clone()).unwrap();

    assert!(matches!(
        store.activate(&license.license_key, &machine()),
        Err(LicenseError::Revoked)
    ));
}

// ── FileStore ────────────────────────────────────────────────────

#[test]
fn file_store_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("licenses.json"));
    assert!(store.get("XXXXX").unwrap().is_none());
}

#[test]
fn file_store_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("licenses.json");
    let license = issue_unlimited(&issuer_keystore());

    FileStore::open(&path).put(license.clone()).unwrap();

    let reopened = FileStore::open(&path);
    let fetched = reopened.get(&license.license_key).unwrap().unwrap();
    assert_eq!(fetched, license);
}

#[test]
fn file_store_activation_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("licenses.json");
    let license = issue_unlimited(&issuer_keystore());

    let store = FileStore::open(&path);
    store.put(license.clone()).unwrap();
    store.activate(&license.license_key, &machine()).unwrap();

    let record = FileStore::open(&path)
        .get(&license.license_key)
        .unwrap()
        .unwrap();
    assert_eq!(record.activation_count, 1);
    assert_eq!(record.status, LicenseStatus::Active);
}

#[test]
fn file_store_corrupt_file_is_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("licenses.json");
    std::fs::write(&path, b"{{{ not json").unwrap();
    let store = FileStore::open(&path);
    assert!(matches!(store.get("X"), Err(LicenseError::Storage(_))));
}
