//! Filesystem-backed source nodes

use super::{ContentBlob, SourceChildren, SourceNode};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Normalize path for logs and reports
/// On Windows: Convert backslashes to forward slashes for consistency
/// On Unix: Use path as-is (backslash is a valid filename character)
#[cfg(windows)]
pub(crate) fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(not(windows))]
pub(crate) fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// A directory or regular file on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSystemSourceNode {
    path: PathBuf,
    name: String,
    is_dir: bool,
    len: u64,
}

impl FileSystemSourceNode {
    /// Open the node rooted at `path`. Symlinks are not followed.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::symlink_metadata(path)?;

        if metadata.is_symlink() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Refusing to import through symlink: {}", path.display()),
            ));
        }

        Ok(Self::from_parts(
            path.to_path_buf(),
            metadata.is_dir(),
            metadata.len(),
        ))
    }

    fn from_parts(path: PathBuf, is_dir: bool, len: u64) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| normalize_path(&path), |n| n.to_string_lossy().into_owned());
        Self {
            path,
            name,
            is_dir,
            len,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceNode for FileSystemSourceNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_path(&self) -> String {
        normalize_path(&self.path)
    }

    fn is_folderish(&self) -> bool {
        self.is_dir
    }

    fn children(&self) -> io::Result<SourceChildren<'_>> {
        if !self.is_dir {
            return Ok(Box::new(std::iter::empty()));
        }

        let entries = fs::read_dir(&self.path)?;
        let iter = entries.filter_map(|entry| {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => return Some(Err(e)),
            };
            let entry_path = entry.path();
            // DirEntry::metadata does not traverse symlinks
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => return Some(Err(e)),
            };

            if metadata.is_dir() || metadata.is_file() {
                let node = Self::from_parts(entry_path, metadata.is_dir(), metadata.len());
                Some(Ok(Box::new(node) as Box<dyn SourceNode>))
            } else {
                log::trace!("Skipping special file {}", entry_path.display());
                None
            }
        });

        Ok(Box::new(iter))
    }

    fn content(&self) -> io::Result<Option<ContentBlob>> {
        if self.is_dir {
            return Ok(None);
        }
        let file = fs::File::open(&self.path)?;
        Ok(Some(ContentBlob::new(
            self.name.clone(),
            self.len,
            Box::new(io::BufReader::new(file)),
        )))
    }
}
