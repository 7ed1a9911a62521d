//! File handle: one open file on one backend
//!
//! A handle holds at most one read stream and one write stream. Writes are
//! serialized by a per-handle lock that also guards the write cursor; reads
//! run concurrently against the shared read stream. A lifecycle gate is held
//! shared by every operation and exclusively by [`FileHandle::close`], so
//! close waits for in-flight operations and nothing runs on the streams
//! once it has begun.

use crate::registry::BackendRef;
use crate::status::backend_error;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use shim_core::{Error, OpenOptions, Result, ShortReadPolicy};
use std::fmt;
use std::sync::Arc;
use storage::{FileOptions, FileSyncer, RandomAccessFile, WritableFile};
use tracing::{debug, trace, warn};

/// Write stream plus the offset the next write must start at
struct WriteState {
    stream: Box<dyn WritableFile>,
    cursor: u64,
}

/// One open file
pub struct FileHandle {
    /// Path the file was opened with
    path: String,

    /// Backend the streams belong to
    backend: BackendRef,

    /// Present iff opened for read
    read_stream: Option<Box<dyn RandomAccessFile>>,

    /// Present iff opened for write
    writer: Option<Mutex<WriteState>>,

    /// Lock-free sync path, when the backend offers one
    syncer: Option<Arc<dyn FileSyncer>>,

    /// `true` until close begins
    gate: RwLock<bool>,

    /// Reporting of reads shorter than requested
    short_read: ShortReadPolicy,
}

impl FileHandle {
    /// Open `path` on `backend` with the requested capabilities
    ///
    /// All or nothing: if any requested stream cannot be created, streams
    /// already created are released and the error is returned.
    pub fn open(
        backend: BackendRef,
        path: &str,
        opts: OpenOptions,
        short_read: ShortReadPolicy,
    ) -> Result<Self> {
        if !opts.read && !opts.write {
            return Err(Error::InvalidArgument {
                message: format!("{} must be opened for read, write or both", path),
            });
        }

        let file_opts = FileOptions::direct(opts.direct);

        let mut write_stream = if opts.write {
            let stream = backend
                .fs()
                .new_writable_file(path, &file_opts)
                .map_err(|s| backend_error("open for write", path, s))?;
            Some(stream)
        } else {
            None
        };

        let read_stream = if opts.read {
            match backend.fs().new_random_access_file(path, &file_opts) {
                Ok(stream) => Some(stream),
                Err(status) => {
                    if let Some(stream) = write_stream.as_mut() {
                        if let Err(e) = stream.close() {
                            warn!(path, error = %e, "Failed to release write stream");
                        }
                    }
                    return Err(backend_error("open for read", path, status));
                }
            }
        } else {
            None
        };

        let syncer = write_stream.as_ref().and_then(|s| s.concurrent_syncer());
        let writer = write_stream.map(|stream| Mutex::new(WriteState { stream, cursor: 0 }));

        debug!(
            path,
            backend = backend.identifier(),
            read = opts.read,
            write = opts.write,
            direct = opts.direct,
            concurrent_sync = syncer.is_some(),
            "File opened"
        );

        Ok(Self {
            path: path.to_string(),
            backend,
            read_stream,
            writer,
            syncer,
            gate: RwLock::new(true),
            short_read,
        })
    }

    /// Hold the lifecycle gate for the duration of one operation
    fn enter(&self) -> Result<RwLockReadGuard<'_, bool>> {
        let open = self.gate.read();
        if !*open {
            return Err(Error::HandleClosed {
                path: self.path.clone(),
            });
        }
        Ok(open)
    }

    fn writer(&self) -> Result<&Mutex<WriteState>> {
        self.writer.as_ref().ok_or_else(|| Error::NotWritable {
            path: self.path.clone(),
        })
    }

    /// Append `buf` at `offset`, which must equal the write cursor
    pub fn write(&self, buf: &[u8], offset: u64) -> Result<()> {
        let _open = self.enter()?;
        let mut state = self.writer()?.lock();

        if offset != state.cursor {
            return Err(Error::OutOfOrderWrite {
                path: self.path.clone(),
                expected: state.cursor,
                actual: offset,
            });
        }

        state
            .stream
            .append(buf)
            .map_err(|s| backend_error("append", &self.path, s))?;
        state.cursor += buf.len() as u64;

        trace!(path = %self.path, offset, len = buf.len(), cursor = state.cursor, "Appended");
        Ok(())
    }

    /// Read `buf.len()` bytes at `offset` directly into `buf`
    ///
    /// Returns the number of bytes transferred. Under
    /// [`ShortReadPolicy::Reject`] anything less than `buf.len()` is an error.
    pub fn read(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let _open = self.enter()?;
        let stream = self.read_stream.as_ref().ok_or_else(|| Error::NotReadable {
            path: self.path.clone(),
        })?;

        let expected = buf.len();
        let start = buf.as_ptr();
        let data = stream
            .read(offset, buf)
            .map_err(|s| backend_error("read", &self.path, s))?;
        let transferred = data.len();

        // The contract is a zero-copy read into the caller's buffer.
        if transferred > 0 && (data.as_ptr() != start || transferred > expected) {
            return Err(Error::DataMisplaced {
                path: self.path.clone(),
                offset,
            });
        }

        if transferred < expected {
            debug!(path = %self.path, offset, expected, transferred, "Short read");
            if self.short_read == ShortReadPolicy::Reject {
                return Err(Error::ShortRead {
                    path: self.path.clone(),
                    offset,
                    expected,
                    actual: transferred,
                });
            }
        }

        Ok(transferred)
    }

    /// Flush written data; `metadata` also flushes file metadata
    pub fn sync(&self, metadata: bool) -> Result<()> {
        let _open = self.enter()?;
        let writer = self.writer()?;
        let operation = if metadata { "fsync" } else { "sync" };

        let result = match &self.syncer {
            Some(syncer) if metadata => syncer.fsync(),
            Some(syncer) => syncer.sync(),
            None => {
                let mut state = writer.lock();
                if metadata {
                    state.stream.fsync()
                } else {
                    state.stream.sync()
                }
            }
        };

        result.map_err(|s| backend_error(operation, &self.path, s))
    }

    /// Drop any cached content for the whole file
    ///
    /// Without a read stream there is nothing cached under this handle and
    /// the call succeeds without touching the backend.
    pub fn invalidate(&self) -> Result<()> {
        let _open = self.enter()?;
        match &self.read_stream {
            Some(stream) => stream
                .invalidate_cache(0, 0)
                .map_err(|s| backend_error("invalidate", &self.path, s)),
            None => Ok(()),
        }
    }

    /// Close the handle
    ///
    /// Waits for in-flight operations, then closes the write stream. The read
    /// stream is released when the last reference to the handle is dropped.
    pub fn close(&self) -> Result<()> {
        let mut open = self.gate.write();
        if !*open {
            return Err(Error::HandleClosed {
                path: self.path.clone(),
            });
        }
        *open = false;

        match &self.writer {
            Some(writer) => {
                let mut state = writer.lock();
                debug!(path = %self.path, bytes = state.cursor, "Closing write stream");
                state
                    .stream
                    .close()
                    .map_err(|s| backend_error("close", &self.path, s))
            }
            None => Ok(()),
        }
    }

    /// Path the file was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Backend this file lives on
    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }

    /// Returns true if the handle has a read stream
    pub fn can_read(&self) -> bool {
        self.read_stream.is_some()
    }

    /// Returns true if the handle has a write stream
    pub fn can_write(&self) -> bool {
        self.writer.is_some()
    }

    /// Offset the next write must start at, if writable
    pub fn write_cursor(&self) -> Option<u64> {
        self.writer.as_ref().map(|w| w.lock().cursor)
    }

    /// Returns true until close begins
    pub fn is_open(&self) -> bool {
        *self.gate.read()
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("backend", &self.backend)
            .field("read", &self.can_read())
            .field("write", &self.can_write())
            .finish()
    }
}
