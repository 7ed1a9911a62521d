//! In-memory backend
//!
//! Files live in a process-local map. Useful for benchmarking the adapter
//! itself without device noise, and for tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::{FileOptions, FileSystem, IoResult, IoStatus, RandomAccessFile, WritableFile};

type FileData = Arc<RwLock<Vec<u8>>>;

/// In-memory file system backend
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    /// Namespace name, used in logs
    namespace: String,

    /// Map of path to file contents
    files: RwLock<HashMap<String, FileData>>,
}

impl MemoryFileSystem {
    /// Create an empty in-memory namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Namespace name
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Size of a file in bytes, if it exists
    pub fn file_size(&self, path: &str) -> Option<u64> {
        let files = self.files.read();
        files.get(path).map(|data| data.read().len() as u64)
    }

    /// Paths of all files, sorted
    pub fn list(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileSystem for MemoryFileSystem {
    fn name(&self) -> &str {
        "mem"
    }

    #[instrument(skip(self, _opts), fields(backend = "mem", namespace = %self.namespace))]
    fn new_writable_file(&self, path: &str, _opts: &FileOptions) -> IoResult<Box<dyn WritableFile>> {
        let data = {
            let mut files = self.files.write();
            Arc::clone(files.entry(path.to_string()).or_default())
        };
        // Truncate in place so readers already holding the file see it.
        data.write().clear();
        debug!("Created in-memory file");

        Ok(Box::new(MemoryWritableFile {
            data,
            path: path.to_string(),
            closed: false,
        }))
    }

    #[instrument(skip(self, _opts), fields(backend = "mem", namespace = %self.namespace))]
    fn new_random_access_file(
        &self,
        path: &str,
        _opts: &FileOptions,
    ) -> IoResult<Box<dyn RandomAccessFile>> {
        let data = self
            .files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| IoStatus::not_found(format!("{}: no such file", path)))?;

        Ok(Box::new(MemoryRandomAccessFile { data }))
    }
}

/// Append stream into an in-memory file
#[derive(Debug)]
pub struct MemoryWritableFile {
    data: FileData,
    path: String,
    closed: bool,
}

impl MemoryWritableFile {
    fn ensure_open(&self) -> IoResult<()> {
        if self.closed {
            return Err(IoStatus::io_error(format!("{} is closed", self.path)));
        }
        Ok(())
    }
}

impl WritableFile for MemoryWritableFile {
    fn append(&mut self, data: &[u8]) -> IoResult<()> {
        self.ensure_open()?;
        self.data.write().extend_from_slice(data);
        Ok(())
    }

    fn sync(&mut self) -> IoResult<()> {
        self.ensure_open()
    }

    fn fsync(&mut self) -> IoResult<()> {
        self.ensure_open()
    }

    fn close(&mut self) -> IoResult<()> {
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}

/// Positioned-read view of an in-memory file
#[derive(Debug)]
pub struct MemoryRandomAccessFile {
    data: FileData,
}

impl RandomAccessFile for MemoryRandomAccessFile {
    fn read<'a>(&'a self, offset: u64, scratch: &'a mut [u8]) -> IoResult<&'a [u8]> {
        let data = self.data.read();
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let n = scratch.len().min(data.len() - start);
        scratch[..n].copy_from_slice(&data[start..start + n]);
        Ok(&scratch[..n])
    }

    fn invalidate_cache(&self, _offset: u64, _length: u64) -> IoResult<()> {
        Ok(())
    }
}
