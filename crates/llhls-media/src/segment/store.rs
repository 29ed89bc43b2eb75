//! Backing stores for segment bytes.
//!
//! A segment's bytes live in an append-only store that readers address by
//! offset while the producer keeps appending. The store is exclusively owned
//! by its segment and reclaimed when it is dropped.

use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

/// Append-only byte storage with positional reads.
pub trait BackingStore: Send + Sync + fmt::Debug {
    /// Append `data` and return the offset it was written at.
    ///
    /// On failure the committed length is unchanged.
    fn append(&self, data: &[u8]) -> io::Result<u64>;

    /// Fill `buf` with the bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Committed length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store backed by an anonymous temporary file.
///
/// The file is unlinked as soon as it is created, so it never shows up in the
/// work directory and the OS reclaims it when the store is dropped. Reads and
/// writes are positional, so concurrent readers never move the append point.
#[derive(Debug)]
pub struct TempFileStore {
    file: File,
    len: Mutex<u64>,
}

impl TempFileStore {
    /// Create an anonymous file in `dir`.
    pub fn new_in(dir: impl AsRef<Path>) -> io::Result<Self> {
        let file = tempfile::tempfile_in(dir)?;
        Ok(Self {
            file,
            len: Mutex::new(0),
        })
    }
}

impl BackingStore for TempFileStore {
    fn append(&self, data: &[u8]) -> io::Result<u64> {
        let mut len = self.len.lock();
        let offset = *len;
        write_all_at(&self.file, data, offset)?;
        *len += data.len() as u64;
        Ok(offset)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        read_exact_at(&self.file, buf, offset)
    }

    fn len(&self) -> u64 {
        *self.len.lock()
    }
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::write_all_at(file, buf, offset)
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    std::os::unix::fs::FileExt::read_exact_at(file, buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackingStore for MemoryStore {
    fn append(&self, data: &[u8]) -> io::Result<u64> {
        let mut store = self.data.write();
        let offset = store.len() as u64;
        store.extend_from_slice(data);
        Ok(offset)
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let store = self.data.read();
        let start = usize::try_from(offset).map_err(|_| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= store.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(&store[start..end]);
        Ok(())
    }

    fn len(&self) -> u64 {
        self.data.read().len() as u64
    }
}
