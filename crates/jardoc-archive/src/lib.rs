//! Read-only file system view over a zip archive held in memory.
//!
//! A javadoc jar is indexed once into a [`VirtualFileSystem`]; afterwards any number of
//! readers can [`open`](VirtualFileSystem::open) paths concurrently. Directories are
//! inferred from entry path prefixes, and compressed entries support emulated seeking
//! (see [`VirtualFile`]).

mod dir;
mod entry;
mod error;
mod file;
mod fs;

pub use dir::VirtualDirectory;
pub use entry::{Metadata, NodeKind};
pub use error::{Result, VfsError};
pub use file::VirtualFile;
pub use fs::{Handle, VirtualFileSystem};
