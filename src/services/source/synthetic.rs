//! Generated source trees for load testing.
//!
//! The tree shape is fixed by a [`SyntheticLayout`]; leaf content is
//! pseudo-random text derived from the leaf's path, so two walks of the same
//! layout produce identical bytes.

use super::{ContentBlob, SourceChildren, SourceNode};
use serde::{Deserialize, Serialize};
use std::io::{self, Cursor};
use std::sync::Arc;

const WORDS: &[&str] = &[
    "archive", "batch", "commit", "document", "folder", "import", "ledger", "memo", "note",
    "policy", "queue", "record", "report", "session", "store", "tree", "volume", "worker",
];

/// Shape of a generated tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticLayout {
    /// Levels of folders below the root
    pub depth: u32,
    pub folders_per_folder: u32,
    pub leaves_per_folder: u32,
    pub leaf_size: u64,
}

impl Default for SyntheticLayout {
    fn default() -> Self {
        Self {
            depth: 3,
            folders_per_folder: 4,
            leaves_per_folder: 10,
            leaf_size: 1024,
        }
    }
}

impl SyntheticLayout {
    /// Folders in the generated tree, root included
    #[must_use]
    pub fn folder_count(&self) -> u64 {
        let fan = u64::from(self.folders_per_folder);
        (0..=self.depth).map(|level| fan.pow(level)).sum()
    }

    /// Leaves in the generated tree
    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        self.folder_count() * u64::from(self.leaves_per_folder)
    }

    #[must_use]
    pub fn node_count(&self) -> u64 {
        self.folder_count() + self.leaf_count()
    }
}

/// Node of a generated tree
#[derive(Debug, Clone)]
pub struct SyntheticSourceNode {
    layout: Arc<SyntheticLayout>,
    name: String,
    path: String,
    level: u32,
    folder: bool,
}

impl SyntheticSourceNode {
    #[must_use]
    pub fn root(name: impl Into<String>, layout: SyntheticLayout) -> Self {
        let name = name.into();
        Self {
            layout: Arc::new(layout),
            path: format!("/{name}"),
            name,
            level: 0,
            folder: true,
        }
    }

    fn child(&self, name: String, folder: bool) -> Self {
        Self {
            layout: Arc::clone(&self.layout),
            path: format!("{}/{name}", self.path),
            name,
            level: self.level + 1,
            folder,
        }
    }

    fn generate_text(&self) -> Vec<u8> {
        let size = usize::try_from(self.layout.leaf_size).unwrap_or(usize::MAX);
        let mut out = Vec::with_capacity(size);
        let mut state = seed_for(&self.path);

        while out.len() < size {
            state = xorshift(state);
            let word = WORDS[(state % WORDS.len() as u64) as usize];
            out.extend_from_slice(word.as_bytes());
            out.push(if state % 13 == 0 { b'\n' } else { b' ' });
        }
        out.truncate(size);
        out
    }
}

fn seed_for(path: &str) -> u64 {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in path.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash | 1
}

fn xorshift(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

impl SourceNode for SyntheticSourceNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_path(&self) -> String {
        self.path.clone()
    }

    fn is_folderish(&self) -> bool {
        self.folder
    }

    fn children(&self) -> io::Result<SourceChildren<'_>> {
        if !self.folder {
            return Ok(Box::new(std::iter::empty()));
        }

        let folders = if self.level < self.layout.depth {
            self.layout.folders_per_folder
        } else {
            0
        };

        let folder_iter = (0..folders).map(move |i| {
            Ok::<_, io::Error>(Box::new(self.child(format!("folder-{i}"), true)) as Box<dyn SourceNode>)
        });
        let leaf_iter = (0..self.layout.leaves_per_folder).map(move |i| {
            Ok::<_, io::Error>(Box::new(self.child(format!("doc-{i}.txt"), false)) as Box<dyn SourceNode>)
        });

        Ok(Box::new(leaf_iter.chain(folder_iter)))
    }

    fn content(&self) -> io::Result<Option<ContentBlob>> {
        if self.folder {
            return Ok(None);
        }
        Ok(Some(ContentBlob::new(
            self.name.clone(),
            self.layout.leaf_size,
            Box::new(Cursor::new(self.generate_text())),
        )))
    }
}
