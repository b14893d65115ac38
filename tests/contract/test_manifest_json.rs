//! Contract test for the manifest JSON shape

use crate::fixtures::{run_import, test_options};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use treeimport::io::manifest::{Manifest, write_manifest};
use treeimport::services::policy::NeverFork;
use treeimport::services::source::MemorySourceNode;
use treeimport::InMemoryStore;

#[test]
fn test_manifest_json_fields() {
    let temp_dir = TempDir::new().unwrap();
    let store = InMemoryStore::new("archive");
    let root = MemorySourceNode::folder("box", vec![MemorySourceNode::leaf("a.txt", "abc")]);
    run_import(&store, root, test_options(), Arc::new(NeverFork)).unwrap();

    let path = temp_dir.path().join("manifest.json");
    write_manifest(&path, &Manifest::from_store(&store, "archive", "job")).unwrap();
    let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(value["repository"], "archive");
    assert_eq!(value["job_name"], "job");
    assert_eq!(value["folder_count"], 1);
    assert_eq!(value["leaf_count"], 1);

    let entries = value["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let folder = &entries[0];
    assert_eq!(folder["path"], "/box");
    assert_eq!(folder["kind"], "folder");
    assert_eq!(folder["doc_type"], "Folder");
    assert!(folder["parent_id"].is_u64());
    assert!(folder["content"].is_null());

    let leaf = &entries[1];
    assert_eq!(leaf["kind"], "leaf");
    assert_eq!(leaf["name"], "a.txt");
    assert_eq!(leaf["parent_id"], folder["id"]);
    assert_eq!(leaf["content"]["filename"], "a.txt");
    assert_eq!(leaf["content"]["size"], 3);
    assert!(leaf["content"].get("data").is_none());
}
