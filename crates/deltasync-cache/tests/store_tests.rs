//! Integration tests for InMemoryStore with file persistence
//!
//! Each test uses its own temporary state directory, drives the store
//! through the IStore port and then restores a fresh store from disk.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use deltasync_cache::{FileStatePersister, InMemoryStore};
use deltasync_core::config::ConfigBuilder;
use deltasync_core::domain::{
    Folder, FolderDelta, FolderId, Message, MessageDelta, MessageId, SyncKey,
};
use deltasync_core::ports::IStore;

// ============================================================================
// Test helpers
// ============================================================================

fn fid(s: &str) -> FolderId {
    s.parse().unwrap()
}

fn mid(s: &str) -> MessageId {
    s.parse().unwrap()
}

fn key(s: &str) -> SyncKey {
    s.parse().unwrap()
}

fn message(id: &str, subject: &str) -> Message {
    Message::new(
        mid(id),
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        1024,
        false,
        subject,
        "sender@example.com",
        false,
    )
}

fn persistent_store(dir: &TempDir) -> (Arc<FileStatePersister>, InMemoryStore) {
    let persister = Arc::new(FileStatePersister::new(dir.path()).unwrap());
    let store = InMemoryStore::restore(persister.clone()).unwrap();
    (persister, store)
}

// ============================================================================
// Restore
// ============================================================================

#[test]
fn test_restore_from_empty_directory() {
    let dir = TempDir::new().unwrap();
    let (_, store) = persistent_store(&dir);
    assert!(store.usernames().is_empty());
}

#[test]
fn test_changes_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let (_, store) = persistent_store(&dir);

        let mut folders = FolderDelta::new();
        folders.added.push(Folder::new(fid("f1"), "Inbox"));
        folders.added.push(Folder::new(fid("f2"), "Drafts"));
        store.update_folders("alice@example.com", key("fk1"), folders);

        let mut messages = MessageDelta::new();
        messages.added.push(message("m1", "Hello"));
        messages.added.push(message("m2", "Agenda"));
        store.update_messages("alice@example.com", &fid("f1"), key("mk1"), messages);
    }

    let (_, store) = persistent_store(&dir);
    assert_eq!(store.folders_sync_key("alice@example.com"), key("fk1"));
    assert_eq!(store.folders("alice@example.com").len(), 2);
    assert_eq!(
        store.messages_sync_key("alice@example.com", &fid("f1")),
        key("mk1")
    );

    let mut subjects: Vec<_> = store
        .messages("alice@example.com", &fid("f1"))
        .into_iter()
        .map(|m| m.subject().to_string())
        .collect();
    subjects.sort();
    assert_eq!(subjects, vec!["Agenda", "Hello"]);
}

#[test]
fn test_reset_is_persisted() {
    let dir = TempDir::new().unwrap();
    {
        let (_, store) = persistent_store(&dir);
        let mut messages = MessageDelta::new();
        messages.added.push(message("m1", "Hello"));
        store.update_messages("alice", &fid("f1"), key("mk7"), messages);
        store.reset_messages("alice", &fid("f1"));
    }

    let (persister, store) = persistent_store(&dir);
    assert!(store.messages_sync_key("alice", &fid("f1")).is_initial());
    assert!(store.messages("alice", &fid("f1")).is_empty());
    assert!(persister.load("alice").unwrap().is_some());
}

#[test]
fn test_users_get_separate_files() {
    let dir = TempDir::new().unwrap();
    let (persister, store) = persistent_store(&dir);

    store.update_folders("alice", key("a1"), FolderDelta::new());
    store.update_folders("bob", key("b1"), FolderDelta::new());

    assert_ne!(persister.path_for("alice"), persister.path_for("bob"));
    assert_eq!(
        persister.load("alice").unwrap().unwrap().folders_sync_key(),
        &key("a1")
    );
    assert_eq!(
        persister.load("bob").unwrap().unwrap().folders_sync_key(),
        &key("b1")
    );
}

#[test]
fn test_from_config_without_persistence_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .cache_state_dir(dir.path().join("state"))
        .cache_persist(false)
        .build();

    let store = InMemoryStore::from_config(&config.cache).unwrap();
    store.update_folders("alice", key("k1"), FolderDelta::new());

    assert!(!dir.path().join("state").exists());
    assert_eq!(store.folders_sync_key("alice"), key("k1"));
}

#[test]
fn test_from_config_with_persistence_restores() {
    let dir = TempDir::new().unwrap();
    let config = ConfigBuilder::new()
        .cache_state_dir(dir.path().to_path_buf())
        .build();

    InMemoryStore::from_config(&config.cache)
        .unwrap()
        .update_folders("alice", key("k1"), FolderDelta::new());

    let store = InMemoryStore::from_config(&config.cache).unwrap();
    assert_eq!(store.folders_sync_key("alice"), key("k1"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_updates_for_different_folders() {
    let store = Arc::new(InMemoryStore::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                let folder = fid(&format!("f{i}"));
                for n in 0..25 {
                    let mut delta = MessageDelta::new();
                    delta.added.push(message(&format!("m{i}-{n}"), "s"));
                    store.update_messages("alice", &folder, key(&format!("k{n}")), delta);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..8 {
        let folder = fid(&format!("f{i}"));
        assert_eq!(store.messages("alice", &folder).len(), 25);
        assert_eq!(store.messages_sync_key("alice", &folder), key("k24"));
    }
}
