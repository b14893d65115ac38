//! Source trees the importer walks.
//!
//! A source node is either a folder (with lazily fetched children) or a leaf
//! (optionally carrying a content blob). Nodes are immutable from the
//! engine's point of view and must be `Send` so a subtree can be handed to a
//! worker on another thread.

pub mod fs;
pub mod memory;
pub mod synthetic;

use std::io::{self, Read};

pub use fs::FileSystemSourceNode;
pub use memory::MemorySourceNode;
pub use synthetic::{SyntheticLayout, SyntheticSourceNode};

/// Lazily produced children of a folder node
pub type SourceChildren<'a> = Box<dyn Iterator<Item = io::Result<Box<dyn SourceNode>>> + 'a>;

/// Content attached to a leaf
pub struct ContentBlob {
    pub filename: String,
    pub size: u64,
    pub reader: Box<dyn Read + Send>,
}

impl ContentBlob {
    #[must_use]
    pub fn new(filename: impl Into<String>, size: u64, reader: Box<dyn Read + Send>) -> Self {
        Self {
            filename: filename.into(),
            size,
            reader,
        }
    }

    /// Read the whole blob into memory.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let capacity = usize::try_from(self.size).unwrap_or(0);
        let mut buf = Vec::with_capacity(capacity);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for ContentBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentBlob")
            .field("filename", &self.filename)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A node of the external tree being imported
pub trait SourceNode: Send + Sync + std::fmt::Debug {
    /// Name of this node, used as the target entry name
    fn name(&self) -> &str;

    /// Full path of this node within its source, for logs and errors
    fn source_path(&self) -> String;

    /// Whether this node can hold children
    fn is_folderish(&self) -> bool;

    /// Fetch the children. Every call returns a fresh sequence.
    fn children(&self) -> io::Result<SourceChildren<'_>>;

    /// Content attached to this node, if any
    fn content(&self) -> io::Result<Option<ContentBlob>> {
        Ok(None)
    }
}
