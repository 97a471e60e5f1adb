use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::entry::{EntryData, EntryStream, Metadata};
use crate::error::{Result, VfsError};
use crate::fs::Tree;

/// An open archive entry that behaves like a seekable file.
///
/// Compressed entries can only be decoded front to back, so seeking is emulated:
/// [`Seek::seek`] only records the requested offset, and the next [`Read::read`]
/// gets there by decoding and discarding bytes. Seeking backwards reopens the
/// stream from the start of the entry first. Forward seeks cost O(distance),
/// backward seeks O(offset).
///
/// A handle is owned by a single reader; open one per request.
pub struct VirtualFile {
    tree: Arc<Tree>,
    id: usize,
    stream: Option<EntryStream>,
    /// Uncompressed offset the open stream is positioned at.
    position: u64,
    /// Offset requested by the last `seek`, honoured on the next read.
    requested: u64,
    pending_seek: bool,
}

impl VirtualFile {
    pub(crate) fn new(tree: Arc<Tree>, id: usize) -> Self {
        Self {
            tree,
            id,
            stream: None,
            position: 0,
            requested: 0,
            pending_seek: false,
        }
    }

    fn entry(&self) -> &EntryData {
        &self.tree.files[self.id]
    }

    /// Full path of the entry inside the archive.
    pub fn path(&self) -> &str {
        &self.entry().path
    }

    pub fn stat(&self) -> Metadata {
        self.entry().metadata()
    }

    /// Uncompressed size in bytes.
    pub fn len(&self) -> u64 {
        self.entry().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Offset the next read will start from.
    pub fn logical_offset(&self) -> u64 {
        if self.pending_seek {
            self.requested
        } else {
            self.position
        }
    }

    /// Drop the decompression stream. The handle can be read again afterwards and
    /// starts over from offset 0.
    pub fn close(&mut self) {
        self.stream = None;
        self.position = 0;
        self.requested = 0;
        self.pending_seek = false;
    }

    fn reopen(&mut self) -> Result<()> {
        let stream = self.entry().open(&self.tree.data)?;
        self.stream = Some(stream);
        self.position = 0;
        Ok(())
    }

    /// Decode and discard bytes until the stream reaches the requested offset (or EOF).
    fn skip_forward(&mut self) -> io::Result<()> {
        let distance = self.requested.saturating_sub(self.position);
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        if distance > 0 {
            let skipped = io::copy(&mut stream.by_ref().take(distance), &mut io::sink())?;
            self.position += skipped;
        }
        Ok(())
    }
}

impl Read for VirtualFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.stream.is_none() {
            self.reopen()?;
        }

        if self.pending_seek {
            if self.requested < self.position {
                tracing::trace!(
                    target = "jardoc.archive",
                    path = %self.path(),
                    from = self.position,
                    to = self.requested,
                    "backward seek; reopening entry stream"
                );
                self.reopen()?;
            }
            self.skip_forward()?;
            self.pending_seek = false;
        }

        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        let read = stream.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

impl Seek for VirtualFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.logical_offset().checked_add_signed(delta),
            SeekFrom::End(delta) => self.len().checked_add_signed(delta),
        };
        let Some(target) = target else {
            return Err(VfsError::InvalidArgument(format!(
                "seek to {pos:?} in {} leaves the valid offset range",
                self.path()
            ))
            .into());
        };

        self.requested = target;
        self.pending_seek = true;
        Ok(target)
    }
}

impl fmt::Debug for VirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFile")
            .field("path", &self.path())
            .field("open", &self.stream.is_some())
            .field("position", &self.position)
            .field("requested", &self.requested)
            .field("pending_seek", &self.pending_seek)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom, Write};

    use zip::write::FileOptions;
    use zip::CompressionMethod;

    use crate::VirtualFileSystem;

    fn archive_with(name: &str, contents: &[u8], method: CompressionMethod) -> VirtualFileSystem {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(method);
        zip.start_file(name, options).unwrap();
        zip.write_all(contents).unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        VirtualFileSystem::from_bytes(bytes).unwrap()
    }

    fn alphabet() -> Vec<u8> {
        (0..4096u32).map(|i| b'a' + (i % 26) as u8).collect()
    }

    #[test]
    fn seek_before_first_read_is_honoured() {
        let fs = archive_with("a.txt", &alphabet(), CompressionMethod::Deflated);
        let mut file = fs.open("a.txt").unwrap().into_file().unwrap();

        assert_eq!(file.seek(SeekFrom::Start(27)).unwrap(), 27);
        let mut buf = [0u8; 3];
        file.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"bcd");
    }

    #[test]
    fn backward_seek_reopens_the_stream() {
        let fs = archive_with("a.txt", &alphabet(), CompressionMethod::Deflated);
        let mut file = fs.open("a.txt").unwrap().into_file().unwrap();

        let mut buf = [0u8; 100];
        file.read_exact(&mut buf).unwrap();
        assert_eq!(file.logical_offset(), 100);

        file.seek(SeekFrom::Start(2)).unwrap();
        let mut small = [0u8; 4];
        file.read_exact(&mut small).unwrap();
        assert_eq!(&small, b"cdef");
        assert_eq!(file.logical_offset(), 6);
    }

    #[test]
    fn seek_whence_variants_resolve_against_logical_offset_and_size() {
        let fs = archive_with("a.txt", b"0123456789", CompressionMethod::Stored);
        let mut file = fs.open("a.txt").unwrap().into_file().unwrap();

        assert_eq!(file.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(file.seek(SeekFrom::Current(2)).unwrap(), 6);
        assert_eq!(file.seek(SeekFrom::End(-3)).unwrap(), 7);

        let mut rest = Vec::new();
        file.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"789");
    }

    #[test]
    fn negative_seek_is_invalid_input() {
        let fs = archive_with("a.txt", b"0123456789", CompressionMethod::Stored);
        let mut file = fs.open("a.txt").unwrap().into_file().unwrap();

        let err = file.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        let err = file.seek(SeekFrom::End(-11)).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn seeking_past_the_end_reads_nothing() {
        let fs = archive_with("a.txt", b"0123456789", CompressionMethod::Deflated);
        let mut file = fs.open("a.txt").unwrap().into_file().unwrap();

        file.seek(SeekFrom::Start(50)).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn close_resets_to_the_start() {
        let fs = archive_with("a.txt", b"0123456789", CompressionMethod::Deflated);
        let mut file = fs.open("a.txt").unwrap().into_file().unwrap();

        let mut buf = [0u8; 5];
        file.read_exact(&mut buf).unwrap();
        file.close();

        let mut all = Vec::new();
        file.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"0123456789");
    }
}
