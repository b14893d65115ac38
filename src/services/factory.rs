//! Mapping from source nodes to target entries.
//!
//! The factory decides what a source node becomes in the store and whether
//! the import carries on after a node fails to materialize.

use crate::models::{EntryContent, EntryDraft, EntryRef};
use crate::services::source::SourceNode;
use crate::services::store::{StoreError, TargetSession};
use thiserror::Error;

/// A single node failed to materialize in the target store
#[derive(Error, Debug)]
pub enum CreationError {
    #[error("Store rejected '{path}': {source}")]
    Store {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Cannot read content of '{path}': {source}")]
    Content {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot list children of '{path}': {source}")]
    Listing {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Refused to create '{path}': {reason}")]
    Rejected { path: String, reason: String },
}

impl CreationError {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            CreationError::Store { path, .. }
            | CreationError::Content { path, .. }
            | CreationError::Listing { path, .. }
            | CreationError::Rejected { path, .. } => path,
        }
    }
}

/// Creates target entries for source nodes.
///
/// Implementations are shared by every worker; each call receives the
/// calling worker's own session, so a factory needs no locking unless it
/// keeps state of its own.
pub trait TargetEntryFactory: Send + Sync {
    /// Classify a node without creating anything.
    fn is_folderish(&self, node: &dyn SourceNode) -> bool {
        node.is_folderish()
    }

    fn create_folder(
        &self,
        session: &mut dyn TargetSession,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
    ) -> Result<EntryRef, CreationError>;

    fn create_leaf(
        &self,
        session: &mut dyn TargetSession,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
    ) -> Result<EntryRef, CreationError>;

    /// Returns whether the import should continue after a folder failed.
    fn on_folder_creation_error(
        &self,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
        error: &CreationError,
    ) -> bool;

    /// Returns whether the import should continue after a leaf failed.
    fn on_leaf_creation_error(
        &self,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
        error: &CreationError,
    ) -> bool;
}

/// Factory used when the caller does not customize entry creation.
///
/// Folders become `Folder` entries and leaves become `File` entries carrying
/// their content.
#[derive(Debug, Clone)]
pub struct DefaultEntryFactory {
    pub folder_type: String,
    pub leaf_type: String,
    /// Read content bytes into the entry; otherwise only filename and size are kept
    pub ingest_content: bool,
    /// Verdict returned by both error hooks
    pub continue_on_error: bool,
}

impl Default for DefaultEntryFactory {
    fn default() -> Self {
        Self {
            folder_type: "Folder".to_string(),
            leaf_type: "File".to_string(),
            ingest_content: true,
            continue_on_error: true,
        }
    }
}

impl DefaultEntryFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ingest_content(mut self, ingest: bool) -> Self {
        self.ingest_content = ingest;
        self
    }

    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    fn read_content(&self, node: &dyn SourceNode) -> Result<Option<EntryContent>, CreationError> {
        let blob = node.content().map_err(|source| CreationError::Content {
            path: node.source_path(),
            source,
        })?;

        let Some(blob) = blob else {
            return Ok(None);
        };

        let filename = blob.filename.clone();
        let size = blob.size;
        let data = if self.ingest_content {
            let bytes = blob.into_bytes().map_err(|source| CreationError::Content {
                path: node.source_path(),
                source,
            })?;
            Some(bytes)
        } else {
            None
        };

        let size = data.as_ref().map_or(size, |d| d.len() as u64);
        Ok(Some(EntryContent {
            filename,
            size,
            data,
        }))
    }
}

impl TargetEntryFactory for DefaultEntryFactory {
    fn create_folder(
        &self,
        session: &mut dyn TargetSession,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
    ) -> Result<EntryRef, CreationError> {
        let draft = EntryDraft::folder(node.name(), self.folder_type.as_str());
        session
            .create_entry(parent, draft)
            .map_err(|source| CreationError::Store {
                path: node.source_path(),
                source,
            })
    }

    fn create_leaf(
        &self,
        session: &mut dyn TargetSession,
        parent: Option<&EntryRef>,
        node: &dyn SourceNode,
    ) -> Result<EntryRef, CreationError> {
        let content = self.read_content(node)?;
        let draft = EntryDraft::leaf(node.name(), self.leaf_type.as_str(), content);
        session
            .create_entry(parent, draft)
            .map_err(|source| CreationError::Store {
                path: node.source_path(),
                source,
            })
    }

    fn on_folder_creation_error(
        &self,
        _parent: Option<&EntryRef>,
        node: &dyn SourceNode,
        error: &CreationError,
    ) -> bool {
        log::warn!(
            "Folder {} not imported, its subtree is skipped: {error}",
            node.source_path()
        );
        self.continue_on_error
    }

    fn on_leaf_creation_error(
        &self,
        _parent: Option<&EntryRef>,
        node: &dyn SourceNode,
        error: &CreationError,
    ) -> bool {
        log::warn!("Document {} not imported: {error}", node.source_path());
        self.continue_on_error
    }
}
