//! Unit tests for source nodes

use crate::fixtures::{create_fs_tree, sample_tree, source_paths, write_file_sync};
use tempfile::TempDir;
use treeimport::services::source::{
    FileSystemSourceNode, MemorySourceNode, SourceNode, SyntheticLayout, SyntheticSourceNode,
};

fn child_names(node: &dyn SourceNode) -> Vec<String> {
    let mut names: Vec<String> = node
        .children()
        .unwrap()
        .map(|c| c.unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_memory_tree_paths_and_content() {
    let root = sample_tree();

    assert_eq!(root.node_count(), 9);
    assert_eq!(root.source_path(), "/root");
    assert!(source_paths(&root).contains(&"/root/a/deep/d1.txt".to_string()));
    assert_eq!(child_names(&root), vec!["a", "b", "top.txt"]);

    let leaf = MemorySourceNode::leaf("n.txt", "abc");
    assert!(!leaf.is_folderish());
    assert_eq!(leaf.children().unwrap().count(), 0);
    let blob = leaf.content().unwrap().unwrap();
    assert_eq!(blob.filename, "n.txt");
    assert_eq!(blob.size, 3);
    assert_eq!(blob.into_bytes().unwrap(), b"abc");

    assert!(root.content().unwrap().is_none());
}

#[test]
fn test_children_can_be_listed_repeatedly() {
    let root = sample_tree();
    assert_eq!(child_names(&root), child_names(&root));
}

#[test]
fn test_synthetic_layout_counts() {
    let layout = SyntheticLayout {
        depth: 2,
        folders_per_folder: 3,
        leaves_per_folder: 4,
        leaf_size: 32,
    };
    assert_eq!(layout.folder_count(), 13);
    assert_eq!(layout.leaf_count(), 52);
    assert_eq!(layout.node_count(), 65);

    let root = SyntheticSourceNode::root("gen", layout);
    assert_eq!(source_paths(&root).len(), 65);
}

#[test]
fn test_synthetic_content_is_deterministic() {
    let layout = SyntheticLayout {
        depth: 1,
        folders_per_folder: 1,
        leaves_per_folder: 2,
        leaf_size: 200,
    };
    let read = |node: &SyntheticSourceNode| -> Vec<Vec<u8>> {
        node.children()
            .unwrap()
            .map(|c| c.unwrap())
            .filter(|c| !c.is_folderish())
            .map(|c| c.content().unwrap().unwrap().into_bytes().unwrap())
            .collect()
    };

    let first = read(&SyntheticSourceNode::root("gen", layout));
    let second = read(&SyntheticSourceNode::root("gen", layout));

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert!(first.iter().all(|bytes| bytes.len() == 200));
    assert_ne!(first[0], first[1]);
}

#[test]
fn test_filesystem_node_walks_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_fs_tree(temp_dir.path()).unwrap();

    let node = FileSystemSourceNode::open(&root).unwrap();
    assert!(node.is_folderish());
    assert_eq!(node.name(), "tree");
    assert_eq!(child_names(&node), vec!["data", "docs", "readme.txt"]);

    let file = FileSystemSourceNode::open(root.join("readme.txt")).unwrap();
    assert!(!file.is_folderish());
    let blob = file.content().unwrap().unwrap();
    assert_eq!(blob.size, 13);
    assert_eq!(blob.into_bytes().unwrap(), b"Hello, World!");
}

#[test]
fn test_filesystem_open_missing_path() {
    let temp_dir = TempDir::new().unwrap();
    assert!(FileSystemSourceNode::open(temp_dir.path().join("nope")).is_err());
}

#[cfg(unix)]
#[test]
fn test_filesystem_symlinks_are_not_followed() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    std::fs::create_dir(base.join("real")).unwrap();
    write_file_sync(base.join("real/file.txt"), b"x").unwrap();
    std::os::unix::fs::symlink(base.join("real"), base.join("link")).unwrap();

    assert!(FileSystemSourceNode::open(base.join("link")).is_err());

    let node = FileSystemSourceNode::open(base).unwrap();
    assert_eq!(child_names(&node), vec!["real"]);
}
