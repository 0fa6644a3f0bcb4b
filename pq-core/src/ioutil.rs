//! Random-access byte regions. This is the substrate C1 and C6 read from:
//! a file (memory-mapped, so repeated random reads page-fault lazily rather
//! than re-reading through a buffered cursor) or an in-memory buffer (for
//! tests and for callers who already have the bytes).
//!
//! Built as random-access range reads rather than sequential `Read + Seek`,
//! since pages are scattered throughout a column chunk and the page scanner
//! wants to seek to computed offsets without threading a cursor through
//! background tasks.

use std::{fs::File, ops::Range, path::Path, sync::Arc};

use bytes::Bytes;
use memmap2::Mmap;

use crate::error::{ParquetError, Result};

pub trait ByteRegion: Send + Sync + 'static {
    fn len(&self) -> u64;

    /// Read `range` and return an owned, cheaply-cloneable buffer.
    fn read_range(&self, range: Range<u64>) -> Result<Bytes>;

    fn read_all(&self) -> Result<Bytes> {
        self.read_range(0..self.len())
    }
}

/// A memory-mapped file. Reads copy out of the mapping into a `Bytes`
/// buffer (so downstream code owns its bytes and can hand them to a
/// background thread); the mapping itself is what makes that copy page in
/// lazily instead of requiring a prior full read of the file.
pub struct FileRegion {
    mmap: Arc<Mmap>,
}

impl FileRegion {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the file is not expected to be mutated concurrently by
        // another process while this reader is open; this is the same
        // assumption every mmap-based reader in the ecosystem makes.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(FileRegion {
            mmap: Arc::new(mmap),
        })
    }
}

impl ByteRegion for FileRegion {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_range(&self, range: Range<u64>) -> Result<Bytes> {
        let (start, end) = (range.start, range.end);
        if end > self.len() || start > end {
            return Err(ParquetError::Truncated(format!(
                "read range {start}..{end} exceeds file length {}",
                self.len()
            )));
        }
        Ok(Bytes::copy_from_slice(
            &self.mmap[start as usize..end as usize],
        ))
    }
}

/// An in-memory byte region, for tests and embedded buffers.
#[derive(Clone)]
pub struct MemRegion {
    data: Bytes,
}

impl MemRegion {
    pub fn new(data: impl Into<Bytes>) -> Self {
        MemRegion { data: data.into() }
    }
}

impl ByteRegion for MemRegion {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, range: Range<u64>) -> Result<Bytes> {
        let (start, end) = (range.start, range.end);
        if end > self.len() || start > end {
            return Err(ParquetError::Truncated(format!(
                "read range {start}..{end} exceeds buffer length {}",
                self.len()
            )));
        }
        Ok(self.data.slice(start as usize..end as usize))
    }
}
