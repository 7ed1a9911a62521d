//! File system backend traits
//!
//! A backend is an opaque capability for creating streams against one
//! namespace. Writes go through an exclusively owned [`WritableFile`];
//! positioned reads go through a shareable [`RandomAccessFile`].

use std::fmt;
use std::sync::Arc;

use crate::IoResult;

/// Options applied when a stream is created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// Bypass the page cache for reads, when supported
    pub use_direct_reads: bool,

    /// Bypass the page cache for writes, when supported
    pub use_direct_writes: bool,
}

impl FileOptions {
    /// Options with both direct I/O hints set to `direct`
    pub fn direct(direct: bool) -> Self {
        Self {
            use_direct_reads: direct,
            use_direct_writes: direct,
        }
    }
}

/// A namespace of files addressed by path
///
/// Implementations are shared across threads and across many open files.
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Short backend name used in logs (e.g. "posix")
    fn name(&self) -> &str;

    /// Create (or truncate) a file and open it for sequential appends
    fn new_writable_file(&self, path: &str, opts: &FileOptions) -> IoResult<Box<dyn WritableFile>>;

    /// Open an existing file for positioned reads
    fn new_random_access_file(
        &self,
        path: &str,
        opts: &FileOptions,
    ) -> IoResult<Box<dyn RandomAccessFile>>;
}

/// A sequentially written file
///
/// Methods take `&mut self`: callers must serialize access. A backend whose
/// sync path is safe to run concurrently with appends exposes it through
/// [`WritableFile::concurrent_syncer`].
pub trait WritableFile: Send {
    /// Append `data` at the end of the file
    fn append(&mut self, data: &[u8]) -> IoResult<()>;

    /// Flush file data to stable storage
    fn sync(&mut self) -> IoResult<()>;

    /// Flush file data and metadata to stable storage
    fn fsync(&mut self) -> IoResult<()>;

    /// Close the stream; later calls fail
    fn close(&mut self) -> IoResult<()>;

    /// A sync capability usable without holding the writer exclusively
    fn concurrent_syncer(&self) -> Option<Arc<dyn FileSyncer>> {
        None
    }
}

/// Sync capability that is safe to call concurrently with appends
pub trait FileSyncer: Send + Sync {
    fn sync(&self) -> IoResult<()>;

    fn fsync(&self) -> IoResult<()>;
}

/// A file opened for positioned reads; safe for concurrent readers
pub trait RandomAccessFile: Send + Sync {
    /// Read up to `scratch.len()` bytes starting at `offset`
    ///
    /// The returned slice holds the data. It normally borrows `scratch`, but
    /// a backend may hand out a view of its own memory instead.
    fn read<'a>(&'a self, offset: u64, scratch: &'a mut [u8]) -> IoResult<&'a [u8]>;

    /// Drop cached content for `length` bytes at `offset`; a length of 0
    /// means "to the end of the file"
    fn invalidate_cache(&self, offset: u64, length: u64) -> IoResult<()>;
}
