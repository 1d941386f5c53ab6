//! Backing byte sources for lazily loaded documents

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Random-access bytes of an existing document.
pub trait ByteSource {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Read up to `len` bytes starting at `start`. The result is shorter only
    /// when the range runs past the end of the source.
    fn read_range(&mut self, start: u64, len: usize) -> io::Result<Vec<u8>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_range(&mut self, start: u64, len: usize) -> io::Result<Vec<u8>> {
        let total = <[u8]>::len(self);
        let start = usize::try_from(start).unwrap_or(usize::MAX).min(total);
        let end = start.saturating_add(len).min(total);
        Ok(self[start..end].to_vec())
    }
}

/// Source backed by any seekable reader, typically a file.
pub struct ReaderSource<R: Read + Seek> {
    reader: R,
    len: u64,
}

impl<R: Read + Seek> ReaderSource<R> {
    pub fn new(mut reader: R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Self { reader, len })
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl ReaderSource<File> {
    /// Open a file as a byte source
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> ByteSource for ReaderSource<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&mut self, start: u64, len: usize) -> io::Result<Vec<u8>> {
        if start >= self.len {
            return Ok(Vec::new());
        }
        let available = (self.len - start).min(len as u64) as usize;
        let mut buffer = vec![0u8; available];
        self.reader.seek(SeekFrom::Start(start))?;
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

/// Read `[start, start + window)`, then the caller decides whether it needs
/// more. Returns the bytes and whether the end of the source was reached.
pub(crate) fn read_window(
    source: &mut dyn ByteSource,
    start: u64,
    window: usize,
) -> io::Result<(Vec<u8>, bool)> {
    let bytes = source.read_range(start, window)?;
    let at_end = start + bytes.len() as u64 >= source.len();
    Ok((bytes, at_end))
}
