use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use zip::ZipArchive;

use crate::dir::VirtualDirectory;
use crate::entry::{normalize_entry, EntryData, Metadata, RawEntry};
use crate::error::{Result, VfsError};
use crate::file::VirtualFile;

pub(crate) const ROOT: usize = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Inode {
    File(usize),
    Directory(usize),
}

#[derive(Debug)]
pub(crate) struct DirNode {
    pub(crate) name: String,
    pub(crate) children: Vec<Inode>,
    by_name: HashMap<String, Inode>,
}

impl DirNode {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    fn attach(&mut self, name: &str, inode: Inode) {
        self.children.push(inode);
        self.by_name.insert(name.to_string(), inode);
    }

    pub(crate) fn child(&self, name: &str) -> Option<Inode> {
        self.by_name.get(name).copied()
    }
}

/// Immutable index over one archive. Directories live in an arena (`dirs[ROOT]` is the root).
pub(crate) struct Tree {
    pub(crate) data: Arc<[u8]>,
    pub(crate) dirs: Vec<DirNode>,
    pub(crate) files: Vec<EntryData>,
}

impl Tree {
    pub(crate) fn metadata(&self, inode: Inode) -> Metadata {
        match inode {
            Inode::File(id) => self.files[id].metadata(),
            Inode::Directory(id) => Metadata::directory(&self.dirs[id].name),
        }
    }
}

/// A read-only file tree presented over the entries of one zip archive.
///
/// The tree is built once by [`VirtualFileSystem::from_bytes`] and never mutated
/// afterwards, so clones (which share the underlying archive bytes) can be handed to
/// any number of concurrent readers. Each [`VirtualFile`] opened from it owns its own
/// decompression state.
#[derive(Clone)]
pub struct VirtualFileSystem {
    tree: Arc<Tree>,
}

/// Result of [`VirtualFileSystem::open`].
#[derive(Debug)]
pub enum Handle {
    File(VirtualFile),
    Directory(VirtualDirectory),
}

impl Handle {
    pub fn stat(&self) -> Metadata {
        match self {
            Handle::File(file) => file.stat(),
            Handle::Directory(dir) => dir.stat(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Directory(_))
    }

    pub fn into_file(self) -> Result<VirtualFile> {
        match self {
            Handle::File(file) => Ok(file),
            Handle::Directory(dir) => Err(VfsError::IsADirectory {
                path: dir.path().to_string(),
            }),
        }
    }

    pub fn into_directory(self) -> Result<VirtualDirectory> {
        match self {
            Handle::Directory(dir) => Ok(dir),
            Handle::File(file) => Err(VfsError::NotADirectory {
                path: file.path().to_string(),
            }),
        }
    }
}

impl VirtualFileSystem {
    /// Index every entry of the zip archive held in `data`.
    ///
    /// Directory marker entries (names ending in `/`) are ignored; directories are
    /// inferred from the prefixes of file paths. Fails with [`VfsError::Conflict`] if
    /// a path is needed both as a file and as a directory.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data: Arc<[u8]> = data.into();
        let mut archive = ZipArchive::new(Cursor::new(Arc::clone(&data)))?;

        let mut builder = TreeBuilder::default();
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            let raw = RawEntry {
                name: entry.name(),
                encrypted: entry.encrypted(),
                data_start: entry.data_start(),
                compressed_size: entry.compressed_size(),
                size: entry.size(),
                crc32: entry.crc32(),
                compression: entry.compression(),
                unix_mode: entry.unix_mode(),
                modified: entry.last_modified(),
            };
            let normalized = normalize_entry(raw.name);
            if normalized.is_empty() || normalized.ends_with('/') {
                continue;
            }
            let entry = EntryData::from_raw(raw, &data)?;
            builder.insert(entry)?;
        }

        let tree = builder.finish(data);
        tracing::debug!(
            target = "jardoc.archive",
            files = tree.files.len(),
            dirs = tree.dirs.len(),
            bytes = tree.data.len(),
            "indexed archive"
        );
        Ok(Self {
            tree: Arc::new(tree),
        })
    }

    /// Size of the raw (compressed) archive in bytes.
    pub fn archive_len(&self) -> usize {
        self.tree.data.len()
    }

    pub fn file_count(&self) -> usize {
        self.tree.files.len()
    }

    /// Open `path` (relative to the archive root; `""` and `"/"` name the root).
    pub fn open(&self, path: &str) -> Result<Handle> {
        let path = normalize_entry(path);
        let path = path.trim_end_matches('/');
        Ok(match self.resolve(path)? {
            Inode::File(id) => Handle::File(VirtualFile::new(Arc::clone(&self.tree), id)),
            Inode::Directory(id) => Handle::Directory(VirtualDirectory::new(
                Arc::clone(&self.tree),
                id,
                path.to_string(),
            )),
        })
    }

    pub fn stat(&self, path: &str) -> Result<Metadata> {
        let path = normalize_entry(path);
        let inode = self.resolve(path.trim_end_matches('/'))?;
        Ok(self.tree.metadata(inode))
    }

    fn resolve(&self, path: &str) -> Result<Inode> {
        let (parent, leaf) = match path.rsplit_once('/') {
            Some((parent, leaf)) => (parent, leaf),
            None => ("", path),
        };
        if leaf.is_empty() {
            return Ok(Inode::Directory(ROOT));
        }

        let mut dir = ROOT;
        for segment in parent.split('/').filter(|segment| !segment.is_empty()) {
            dir = match self.tree.dirs[dir].child(segment) {
                Some(Inode::Directory(next)) => next,
                Some(Inode::File(_)) => {
                    return Err(VfsError::NotADirectory {
                        path: path.to_string(),
                    })
                }
                None => {
                    return Err(VfsError::NotFound {
                        path: path.to_string(),
                    })
                }
            };
        }

        self.tree.dirs[dir]
            .child(leaf)
            .ok_or_else(|| VfsError::NotFound {
                path: path.to_string(),
            })
    }
}

impl fmt::Debug for VirtualFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFileSystem")
            .field("files", &self.tree.files.len())
            .field("dirs", &self.tree.dirs.len())
            .field("archive_len", &self.tree.data.len())
            .finish()
    }
}

struct TreeBuilder {
    dirs: Vec<DirNode>,
    files: Vec<EntryData>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            dirs: vec![DirNode::new("")],
            files: Vec::new(),
        }
    }
}

impl TreeBuilder {
    fn insert(&mut self, entry: EntryData) -> Result<()> {
        let prefix = entry
            .path
            .rsplit_once('/')
            .map(|(prefix, _)| prefix)
            .unwrap_or("");
        let parent = self.directory_for(prefix)?;
        let name = entry.name.clone();

        match self.dirs[parent].child(&name) {
            Some(Inode::Directory(_)) => Err(VfsError::Conflict { path: entry.path }),
            // Duplicate names: the later entry wins but keeps the earlier position.
            Some(Inode::File(existing)) => {
                self.files[existing] = entry;
                Ok(())
            }
            None => {
                let id = self.files.len();
                self.files.push(entry);
                self.dirs[parent].attach(&name, Inode::File(id));
                Ok(())
            }
        }
    }

    /// Walk `prefix`, creating missing directories along the way.
    fn directory_for(&mut self, prefix: &str) -> Result<usize> {
        let mut current = ROOT;
        let mut walked = String::new();
        for segment in prefix.split('/').filter(|segment| !segment.is_empty()) {
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(segment);

            current = match self.dirs[current].child(segment) {
                Some(Inode::Directory(id)) => id,
                Some(Inode::File(_)) => return Err(VfsError::Conflict { path: walked }),
                None => {
                    let id = self.dirs.len();
                    self.dirs.push(DirNode::new(segment));
                    self.dirs[current].attach(segment, Inode::Directory(id));
                    id
                }
            };
        }
        Ok(current)
    }

    fn finish(self, data: Arc<[u8]>) -> Tree {
        Tree {
            data,
            dirs: self.dirs,
            files: self.files,
        }
    }
}
