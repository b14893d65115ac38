//! JSON manifests of a store's committed entries
//!
//! A manifest records every committed entry (path, kind, type, content
//! metadata) so an in-memory import can be inspected after the process ends.
//! Content bytes are never written.

use crate::models::{EntryKind, StoredEntry};
use crate::services::store::InMemoryStore;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Error, ErrorKind, Result, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub repository: String,
    pub job_name: String,
    pub folder_count: usize,
    pub leaf_count: usize,
    pub entries: Vec<StoredEntry>,
}

impl Manifest {
    /// Capture the committed state of a store.
    #[must_use]
    pub fn from_store(store: &InMemoryStore, repository: &str, job_name: &str) -> Self {
        let entries = store.entries();
        let folder_count = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Folder)
            .count();
        Self {
            repository: repository.to_string(),
            job_name: job_name.to_string(),
            folder_count,
            leaf_count: entries.len() - folder_count,
            entries,
        }
    }
}

/// Write a manifest to a JSON file.
pub fn write_manifest<P: AsRef<Path>>(path: P, manifest: &Manifest) -> Result<()> {
    let file_path = path.as_ref();

    if let Some(parent) = file_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer_pretty(&mut writer, manifest).map_err(Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::debug!(
        "Wrote manifest with {} entries to {}",
        manifest.entries.len(),
        file_path.display()
    );
    Ok(())
}

/// Read a manifest back from a JSON file.
pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let file = File::open(path.as_ref())?;
    let manifest: Manifest = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

    let folders = manifest
        .entries
        .iter()
        .filter(|e| e.kind == EntryKind::Folder)
        .count();
    if folders != manifest.folder_count || manifest.entries.len() - folders != manifest.leaf_count
    {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "manifest counts do not match its entries",
        ));
    }
    Ok(manifest)
}
