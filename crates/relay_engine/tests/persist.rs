use std::fs;

use chrono::{TimeZone, Utc};
use relay_engine::{write_atomically, ContactStore, FileContactStore, StoredContacts};
use tempfile::TempDir;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn save_then_load_preserves_order_and_time() {
    let dir = TempDir::new().unwrap();
    let store = FileContactStore::new(dir.path().join("nested").join("contacts.json"));
    let at = Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap();

    store.save(&names(&["bob", "Alice", "#x"]), at).unwrap();
    let stored = store.load().unwrap();
    assert_eq!(stored.contacts, names(&["bob", "Alice", "#x"]));
    assert_eq!(stored.synced_at, Some(at));
}

#[test]
fn missing_file_reads_empty() {
    let dir = TempDir::new().unwrap();
    let store = FileContactStore::new(dir.path().join("contacts.json"));
    assert_eq!(store.load().unwrap(), StoredContacts::default());
}

#[test]
fn legacy_set_is_sorted_and_upgraded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contacts.json");
    fs::write(
        &path,
        r##"{"friends_list": ["bob", "#x", "Alice"], "sync_time": 1714564800000}"##,
    )
    .unwrap();

    let store = FileContactStore::new(&path);
    let stored = store.load().unwrap();
    assert_eq!(stored.contacts, names(&["Alice", "bob", "#x"]));
    assert_eq!(
        stored.synced_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    );

    let rewritten = fs::read_to_string(&path).unwrap();
    assert!(rewritten.contains("\"contacts\""));
    assert!(!rewritten.contains("friends_list"));
    assert_eq!(store.load().unwrap(), stored);
}

#[test]
fn corrupt_document_is_dropped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contacts.json");
    fs::write(&path, "{not json").unwrap();

    let store = FileContactStore::new(&path);
    assert_eq!(store.load().unwrap(), StoredContacts::default());
    assert!(!path.exists());
}

#[test]
fn atomic_write_replaces_existing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("doc.json");
    write_atomically(&path, "first").unwrap();
    write_atomically(&path, "second").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
