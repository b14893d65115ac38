//! In-memory source trees, cheap to clone and hand across threads

use super::{ContentBlob, SourceChildren, SourceNode};
use std::io::{self, Cursor};
use std::sync::Arc;

#[derive(Debug)]
enum NodeBody {
    Folder(Vec<Arc<MemoryNodeInner>>),
    Leaf(Arc<[u8]>),
}

#[derive(Debug)]
struct MemoryNodeInner {
    name: String,
    body: NodeBody,
}

/// Node of a tree held entirely in memory.
///
/// Cloning shares the subtree; the path is tracked per handle so the same
/// subtree reads correctly wherever it was reached from.
#[derive(Debug, Clone)]
pub struct MemorySourceNode {
    inner: Arc<MemoryNodeInner>,
    path: String,
}

impl MemorySourceNode {
    #[must_use]
    pub fn folder(name: impl Into<String>, children: Vec<MemorySourceNode>) -> Self {
        let name = name.into();
        let children = children.into_iter().map(|c| c.inner).collect();
        Self {
            path: format!("/{name}"),
            inner: Arc::new(MemoryNodeInner {
                name,
                body: NodeBody::Folder(children),
            }),
        }
    }

    #[must_use]
    pub fn leaf(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let data: Vec<u8> = data.into();
        Self {
            path: format!("/{name}"),
            inner: Arc::new(MemoryNodeInner {
                name,
                body: NodeBody::Leaf(Arc::from(data)),
            }),
        }
    }

    /// Number of nodes in this subtree, this node included
    #[must_use]
    pub fn node_count(&self) -> usize {
        fn count(node: &MemoryNodeInner) -> usize {
            match &node.body {
                NodeBody::Folder(children) => {
                    1 + children.iter().map(|c| count(c)).sum::<usize>()
                }
                NodeBody::Leaf(_) => 1,
            }
        }
        count(&self.inner)
    }

    fn child(&self, inner: &Arc<MemoryNodeInner>) -> Self {
        Self {
            path: format!("{}/{}", self.path, inner.name),
            inner: Arc::clone(inner),
        }
    }
}

impl SourceNode for MemorySourceNode {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn source_path(&self) -> String {
        self.path.clone()
    }

    fn is_folderish(&self) -> bool {
        matches!(self.inner.body, NodeBody::Folder(_))
    }

    fn children(&self) -> io::Result<SourceChildren<'_>> {
        match &self.inner.body {
            NodeBody::Folder(children) => Ok(Box::new(
                children
                    .iter()
                    .map(move |c| Ok::<_, io::Error>(Box::new(self.child(c)) as Box<dyn SourceNode>)),
            )),
            NodeBody::Leaf(_) => Ok(Box::new(std::iter::empty())),
        }
    }

    fn content(&self) -> io::Result<Option<ContentBlob>> {
        match &self.inner.body {
            NodeBody::Leaf(data) => {
                let bytes = data.to_vec();
                Ok(Some(ContentBlob::new(
                    self.inner.name.clone(),
                    bytes.len() as u64,
                    Box::new(Cursor::new(bytes)),
                )))
            }
            NodeBody::Folder(_) => Ok(None),
        }
    }
}
