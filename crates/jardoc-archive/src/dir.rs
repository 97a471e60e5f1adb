use std::fmt;
use std::sync::Arc;

use crate::entry::Metadata;
use crate::fs::{DirNode, Tree};

/// An open directory of a [`crate::VirtualFileSystem`].
///
/// Children are listed in the order their first entry appeared in the archive.
pub struct VirtualDirectory {
    tree: Arc<Tree>,
    id: usize,
    path: String,
    cursor: usize,
}

impl VirtualDirectory {
    pub(crate) fn new(tree: Arc<Tree>, id: usize, path: String) -> Self {
        Self {
            tree,
            id,
            path,
            cursor: 0,
        }
    }

    fn node(&self) -> &DirNode {
        &self.tree.dirs[self.id]
    }

    /// Leaf name; empty for the archive root.
    pub fn name(&self) -> &str {
        &self.node().name
    }

    /// Path relative to the archive root, without a trailing slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stat(&self) -> Metadata {
        Metadata::directory(self.name())
    }

    /// All children at once. Does not move the [`read_dir`](Self::read_dir) cursor.
    pub fn entries(&self) -> Vec<Metadata> {
        self.node()
            .children
            .iter()
            .map(|inode| self.tree.metadata(*inode))
            .collect()
    }

    /// Return up to `max` children, continuing where the previous call stopped.
    ///
    /// Once every child has been returned the next call yields an empty page and
    /// rewinds, so a later call starts again from the first child. `max == 0` is
    /// treated as 1.
    pub fn read_dir(&mut self, max: usize) -> Vec<Metadata> {
        let max = max.max(1);
        let children = &self.tree.dirs[self.id].children;
        if self.cursor >= children.len() {
            self.cursor = 0;
            return Vec::new();
        }

        let end = children.len().min(self.cursor + max);
        let page = children[self.cursor..end]
            .iter()
            .map(|inode| self.tree.metadata(*inode))
            .collect();
        self.cursor = end;
        page
    }
}

impl fmt::Debug for VirtualDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualDirectory")
            .field("path", &self.path)
            .field("children", &self.node().children.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}
