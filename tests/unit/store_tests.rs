//! Unit tests for the in-memory transactional store

use std::thread;
use std::time::Duration;
use treeimport::models::{EntryDraft, EntryKind};
use treeimport::services::store::{
    InMemoryStore, StoreError, TargetSession, TargetStore, child_path, path_segments,
};

const TIMEOUT: Duration = Duration::from_secs(60);

#[test]
fn test_staged_entries_are_private_until_commit() {
    let store = InMemoryStore::new("repo");
    let mut writer = store.session();
    let mut reader = store.session();
    writer.begin(TIMEOUT).unwrap();

    let folder = writer
        .create_entry(None, EntryDraft::folder("docs", "Folder"))
        .unwrap();
    assert_eq!(folder.path, "/docs");
    assert_eq!(writer.staged_count(), 1);
    assert!(store.get("/docs").is_none());
    assert!(matches!(reader.resolve(&folder), Err(StoreError::NotFound(_))));

    // Staged parents are usable inside the same transaction
    writer
        .create_entry(Some(&folder), EntryDraft::leaf("a.txt", "File", None))
        .unwrap();
    writer.flush().unwrap();
    writer.commit().unwrap();

    assert_eq!(store.entry_count(), 2);
    assert_eq!(store.commit_log(), vec![2]);
    assert_eq!(reader.resolve(&folder).unwrap(), folder);
    assert!(!writer.in_transaction());
}

#[test]
fn test_rollback_discards_staged_entries() {
    let store = InMemoryStore::default();
    let mut session = store.session();
    session.begin(TIMEOUT).unwrap();
    session
        .create_entry(None, EntryDraft::folder("tmp", "Folder"))
        .unwrap();

    session.rollback().unwrap();

    assert_eq!(store.entry_count(), 0);
    assert!(store.commit_log().is_empty());
    assert!(matches!(session.commit(), Err(StoreError::NoTransaction)));
}

#[test]
fn test_close_rolls_back() {
    let store = InMemoryStore::default();
    {
        let mut session = store.session();
        session.begin(TIMEOUT).unwrap();
        session
            .create_entry(None, EntryDraft::folder("lost", "Folder"))
            .unwrap();
        session.close();
        assert!(matches!(session.begin(TIMEOUT), Err(StoreError::Closed)));
    }
    {
        let mut session = store.session();
        session.begin(TIMEOUT).unwrap();
        session
            .create_entry(None, EntryDraft::folder("dropped", "Folder"))
            .unwrap();
    }
    assert_eq!(store.entry_count(), 0);
    assert_eq!(store.sessions_opened(), 2);
}

#[test]
fn test_duplicate_names_conflict() {
    let store = InMemoryStore::default();
    let mut session = store.session();
    session.begin(TIMEOUT).unwrap();
    session
        .create_entry(None, EntryDraft::folder("x", "Folder"))
        .unwrap();

    let staged_dup = session.create_entry(None, EntryDraft::folder("x", "Folder"));
    assert_eq!(staged_dup, Err(StoreError::Conflict("/x".to_string())));

    session.commit().unwrap();
    session.begin(TIMEOUT).unwrap();
    let committed_dup = session.create_entry(None, EntryDraft::leaf("x", "File", None));
    assert_eq!(committed_dup, Err(StoreError::Conflict("/x".to_string())));
}

#[test]
fn test_concurrent_sessions_conflict_on_commit() {
    let store = InMemoryStore::default();
    let mut first = store.session();
    let mut second = store.session();
    first.begin(TIMEOUT).unwrap();
    second.begin(TIMEOUT).unwrap();

    first.create_entry(None, EntryDraft::folder("same", "Folder")).unwrap();
    second.create_entry(None, EntryDraft::folder("same", "Folder")).unwrap();

    first.commit().unwrap();
    assert_eq!(second.commit(), Err(StoreError::Conflict("/same".to_string())));
    assert_eq!(store.entry_count(), 1);
}

#[test]
fn test_commit_after_timeout_fails_and_rolls_back() {
    let store = InMemoryStore::default();
    let mut session = store.session();
    session.begin(Duration::from_millis(1)).unwrap();
    session
        .create_entry(None, EntryDraft::folder("slow", "Folder"))
        .unwrap();
    thread::sleep(Duration::from_millis(20));

    let result = session.commit();

    assert!(matches!(
        result,
        Err(StoreError::TransactionTimeout { timeout_ms: 1, .. })
    ));
    assert!(!session.in_transaction());
    assert_eq!(store.entry_count(), 0);
}

#[test]
fn test_rollback_only_transaction_cannot_commit() {
    let store = InMemoryStore::default();
    let mut session = store.session();
    session.begin(TIMEOUT).unwrap();
    session
        .create_entry(None, EntryDraft::folder("doomed", "Folder"))
        .unwrap();
    session.set_rollback_only();

    assert!(session.is_rollback_only());
    assert_eq!(session.commit(), Err(StoreError::RollbackOnly));
    assert_eq!(store.entry_count(), 0);
}

#[test]
fn test_create_requires_transaction_and_valid_parent() {
    let store = InMemoryStore::default();
    let mut session = store.session();
    assert_eq!(
        session.create_entry(None, EntryDraft::folder("x", "Folder")),
        Err(StoreError::NoTransaction)
    );

    session.begin(TIMEOUT).unwrap();
    let leaf = session
        .create_entry(None, EntryDraft::leaf("file", "File", None))
        .unwrap();
    assert!(matches!(
        session.create_entry(Some(&leaf), EntryDraft::folder("child", "Folder")),
        Err(StoreError::InvalidPath(_))
    ));
    assert!(matches!(
        session.create_entry(None, EntryDraft::folder("a/b", "Folder")),
        Err(StoreError::InvalidPath(_))
    ));
}

#[test]
fn test_create_path_and_resolve_path() {
    let store = InMemoryStore::default();

    let created = store.create_path("/a/b/c").unwrap();
    assert_eq!(created.path, "/a/b/c");
    assert_eq!(store.entry_count(), 3);
    assert_eq!(store.get("/a/b").unwrap().kind, EntryKind::Folder);

    // Idempotent
    assert_eq!(store.create_path("/a/b/c/").unwrap(), created);
    assert_eq!(store.entry_count(), 3);

    assert_eq!(store.resolve_path("/a/b/c").unwrap(), Some(created));
    assert_eq!(store.resolve_path("/").unwrap().unwrap().id, 0);
    assert_eq!(store.resolve_path("/missing").unwrap(), None);
    assert!(store.resolve_path("relative").is_err());
    assert_eq!(store.repository(), "default");
}

#[test]
fn test_children_of_lists_direct_children() {
    let store = InMemoryStore::default();
    store.create_path("/p/b").unwrap();
    store.create_path("/p/a/deep").unwrap();

    let names: Vec<String> = store.children_of("/p").into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(store.children_of("/nowhere").is_empty());
}

#[test]
fn test_path_helpers() {
    assert_eq!(path_segments("/").unwrap(), Vec::<&str>::new());
    assert_eq!(path_segments("/a/b/").unwrap(), vec!["a", "b"]);
    assert!(path_segments("/a//b").is_err());
    assert!(path_segments("/a/../b").is_err());
    assert!(path_segments("a").is_err());

    assert_eq!(child_path(None, "x"), "/x");
    assert_eq!(child_path(Some("/"), "x"), "/x");
    assert_eq!(child_path(Some("/a"), "x"), "/a/x");
}
