use std::borrow::Cow;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use chrono::NaiveDateTime;
use flate2::read::DeflateDecoder;
use flate2::CrcReader;
use zip::CompressionMethod;

use crate::error::{Result, VfsError};

const DEFAULT_FILE_MODE: u32 = 0o444;
const DIRECTORY_MODE: u32 = 0o555;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// `stat()` result for a node in a [`crate::VirtualFileSystem`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    kind: NodeKind,
    size: u64,
    mode: u32,
    modified: Option<NaiveDateTime>,
}

impl Metadata {
    pub(crate) fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Directory,
            size: 0,
            mode: DIRECTORY_MODE,
            modified: None,
        }
    }

    /// Leaf name (no parent components). The root directory has an empty name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    /// Uncompressed size in bytes; always zero for directories.
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Permission bits (`0o777` mask).
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Timestamp recorded in the archive. Directories are synthesized and carry none.
    pub fn modified(&self) -> Option<NaiveDateTime> {
        self.modified
    }
}

/// Location and shape of one stored entry inside the archive bytes.
#[derive(Debug)]
pub(crate) struct EntryData {
    pub(crate) path: String,
    pub(crate) name: String,
    compression: CompressionMethod,
    data_start: usize,
    compressed_size: usize,
    pub(crate) size: u64,
    crc32: u32,
    mode: u32,
    modified: Option<NaiveDateTime>,
}

/// Central-directory facts about one entry, copied out of the zip reader.
pub(crate) struct RawEntry<'a> {
    pub(crate) name: &'a str,
    pub(crate) encrypted: bool,
    /// Offset of the entry's data, past its local header.
    pub(crate) data_start: u64,
    pub(crate) compressed_size: u64,
    pub(crate) size: u64,
    pub(crate) crc32: u32,
    pub(crate) compression: CompressionMethod,
    pub(crate) unix_mode: Option<u32>,
    pub(crate) modified: Option<zip::DateTime>,
}

impl EntryData {
    pub(crate) fn from_raw(entry: RawEntry<'_>, data: &[u8]) -> Result<Self> {
        let path = normalize_entry(entry.name).into_owned();
        let name = path.rsplit('/').next().unwrap_or_default().to_string();

        if entry.encrypted {
            return Err(VfsError::CorruptEntry {
                path,
                reason: "encrypted entries are not supported",
            });
        }

        let data_start =
            usize::try_from(entry.data_start).map_err(|_| VfsError::CorruptEntry {
                path: path.clone(),
                reason: "data offset does not fit in memory",
            })?;
        let compressed_size =
            usize::try_from(entry.compressed_size).map_err(|_| VfsError::CorruptEntry {
                path: path.clone(),
                reason: "compressed size does not fit in memory",
            })?;
        let in_bounds = data_start
            .checked_add(compressed_size)
            .is_some_and(|end| end <= data.len());
        if !in_bounds {
            return Err(VfsError::CorruptEntry {
                path,
                reason: "entry data extends past the end of the archive",
            });
        }

        let modified = entry.modified.and_then(|dt| {
            chrono::NaiveDate::from_ymd_opt(dt.year().into(), dt.month().into(), dt.day().into())?
                .and_hms_opt(dt.hour().into(), dt.minute().into(), dt.second().into())
        });

        Ok(Self {
            path,
            name,
            compression: entry.compression,
            data_start,
            compressed_size,
            size: entry.size,
            crc32: entry.crc32,
            mode: entry
                .unix_mode
                .map(|mode| mode & 0o777)
                .filter(|mode| *mode != 0)
                .unwrap_or(DEFAULT_FILE_MODE),
            modified,
        })
    }

    pub(crate) fn metadata(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
            kind: NodeKind::File,
            size: self.size,
            mode: self.mode,
            modified: self.modified,
        }
    }

    /// Open a fresh decompression stream positioned at uncompressed offset 0.
    pub(crate) fn open(&self, data: &Arc<[u8]>) -> Result<EntryStream> {
        let window = Cursor::new(EntryBytes {
            data: Arc::clone(data),
            start: self.data_start,
            end: self.data_start + self.compressed_size,
        });
        let decoder = match self.compression {
            CompressionMethod::Stored => Decoder::Stored(window),
            CompressionMethod::Deflated => Decoder::Deflated(DeflateDecoder::new(window)),
            other => {
                return Err(VfsError::UnsupportedCompression {
                    path: self.path.clone(),
                    method: format!("{other:?}"),
                })
            }
        };
        Ok(EntryStream {
            reader: CrcReader::new(decoder),
            path: self.path.clone(),
            expected_size: self.size,
            expected_crc: self.crc32,
            produced: 0,
        })
    }
}

enum Decoder {
    Stored(Cursor<EntryBytes>),
    Deflated(DeflateDecoder<Cursor<EntryBytes>>),
}

impl Read for Decoder {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::Stored(reader) => reader.read(buf),
            Decoder::Deflated(reader) => reader.read(buf),
        }
    }
}

/// Forward-only reader over one entry's uncompressed bytes.
///
/// Fails with [`VfsError::CorruptEntry`] as soon as the entry yields more bytes than
/// the central directory records, and at end of stream if it yielded fewer or the
/// CRC-32 does not match.
pub(crate) struct EntryStream {
    reader: CrcReader<Decoder>,
    path: String,
    expected_size: u64,
    expected_crc: u32,
    produced: u64,
}

impl EntryStream {
    fn corrupt(&self, reason: &'static str) -> io::Error {
        VfsError::CorruptEntry {
            path: self.path.clone(),
            reason,
        }
        .into()
    }

    fn verify_end(&self) -> io::Result<()> {
        if self.produced != self.expected_size {
            return Err(self.corrupt("entry is shorter than its recorded size"));
        }
        if self.reader.crc().sum() != self.expected_crc {
            return Err(self.corrupt("crc-32 mismatch"));
        }
        Ok(())
    }
}

impl Read for EntryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.reader.read(buf)?;
        self.produced += read as u64;
        if self.produced > self.expected_size {
            return Err(self.corrupt("entry is longer than its recorded size"));
        }
        if read == 0 && !buf.is_empty() {
            self.verify_end()?;
        }
        Ok(read)
    }
}

/// Owned view of `data[start..end]` that keeps the archive alive.
pub(crate) struct EntryBytes {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl AsRef<[u8]> for EntryBytes {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}

pub(crate) fn normalize_entry(entry: &str) -> Cow<'_, str> {
    let entry = entry.trim_start_matches(['/', '\\']);
    if entry.contains('\\') {
        Cow::Owned(entry.replace('\\', "/"))
    } else {
        Cow::Borrowed(entry)
    }
}
