//! Option files and manifest export

use crate::fixtures::{run_import, sample_tree, test_options, write_file_sync};
use std::io::ErrorKind;
use std::sync::Arc;
use tempfile::TempDir;
use treeimport::io::config::{load_options, save_options};
use treeimport::io::manifest::{Manifest, read_manifest, write_manifest};
use treeimport::services::policy::NeverFork;
use treeimport::{Error, ImportOptions, InMemoryStore};

#[test]
fn test_saved_options_load_back() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("conf/options.json");
    let opts = ImportOptions {
        job_name: "nightly".to_string(),
        batch_size: 25,
        create_destination: true,
        ..ImportOptions::default()
    };

    save_options(&path, &opts).unwrap();
    let loaded = load_options(&path).unwrap();

    assert_eq!(loaded, opts);
}

#[test]
fn test_partial_options_file_takes_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("options.json");
    write_file_sync(&path, br#"{ "pool_size": 12, "destination_path": "/in" }"#).unwrap();

    let loaded = load_options(&path).unwrap();

    assert_eq!(loaded.pool_size, 12);
    assert_eq!(loaded.destination_path, "/in");
    assert_eq!(loaded.batch_size, 50);
    assert_eq!(loaded.queue_capacity, 10_000);
    assert_eq!(loaded.transaction_timeout_secs, 300);
    assert!(!loaded.fail_on_worker_error);
}

#[test]
fn test_malformed_options_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("options.json");
    write_file_sync(&path, b"{ not json").unwrap();

    assert!(matches!(load_options(&path), Err(Error::Json(_))));
    assert!(matches!(
        load_options(temp_dir.path().join("missing.json")),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_manifest_of_imported_tree() {
    let temp_dir = TempDir::new().unwrap();
    let store = InMemoryStore::new("archive");
    run_import(&store, sample_tree(), test_options(), Arc::new(NeverFork)).unwrap();

    let manifest = Manifest::from_store(&store, "archive", "test");
    assert_eq!(manifest.folder_count, 4);
    assert_eq!(manifest.leaf_count, 5);

    let path = temp_dir.path().join("out/manifest.json");
    write_manifest(&path, &manifest).unwrap();
    let loaded = read_manifest(&path).unwrap();

    assert_eq!(loaded.repository, "archive");
    assert_eq!(loaded.entries.len(), 9);
    assert_eq!(loaded.entries[0].path, "/root");
    // Content bytes are not part of the manifest
    let leaf = loaded
        .entries
        .iter()
        .find(|e| e.path == "/root/top.txt")
        .unwrap();
    assert_eq!(leaf.content.as_ref().unwrap().size, 3);
    assert!(leaf.content.as_ref().unwrap().data.is_none());
}

#[test]
fn test_manifest_with_wrong_counts_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("manifest.json");
    write_file_sync(
        &path,
        br#"{"repository":"r","job_name":"j","folder_count":2,"leaf_count":0,"entries":[]}"#,
    )
    .unwrap();

    let err = read_manifest(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}
