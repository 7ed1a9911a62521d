//! Descriptor table
//!
//! Maps adapter-issued descriptors to open handles. Descriptors come from a
//! monotonically increasing counter and are never reused within the life of
//! the table.

use crate::handle::FileHandle;
use dashmap::DashMap;
use shim_core::{Descriptor, Error, Result};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Thread-safe map of descriptor to open handle
#[derive(Debug)]
pub struct HandleTable {
    handles: DashMap<Descriptor, Arc<FileHandle>>,
    /// Wider than a descriptor so it can run past `i32::MAX` without wrapping
    next: AtomicI64,
}

impl HandleTable {
    /// Create a table whose first descriptor is `base`
    pub fn new(base: i32) -> Self {
        Self {
            handles: DashMap::new(),
            next: AtomicI64::new(i64::from(base)),
        }
    }

    /// Insert `handle` under a fresh descriptor
    pub fn allocate(&self, handle: Arc<FileHandle>) -> Result<Descriptor> {
        let raw = i32::try_from(self.next.fetch_add(1, Ordering::SeqCst))
            .map_err(|_| Error::DescriptorsExhausted)?;
        let fd = Descriptor::from_raw(raw);

        trace!(%fd, path = handle.path(), "Descriptor allocated");
        self.handles.insert(fd, handle);
        Ok(fd)
    }

    /// Look up a descriptor
    pub fn lookup(&self, fd: Descriptor) -> Option<Arc<FileHandle>> {
        self.handles.get(&fd).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a descriptor, failing with `InvalidDescriptor` when absent
    pub fn get(&self, fd: Descriptor) -> Result<Arc<FileHandle>> {
        self.lookup(fd)
            .ok_or(Error::InvalidDescriptor { fd: fd.as_raw() })
    }

    /// Remove a descriptor, returning its handle
    pub fn remove(&self, fd: Descriptor) -> Option<Arc<FileHandle>> {
        self.handles.remove(&fd).map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// All live descriptors, sorted
    pub fn descriptors(&self) -> Vec<Descriptor> {
        let mut fds: Vec<Descriptor> = self.handles.iter().map(|entry| *entry.key()).collect();
        fds.sort();
        fds
    }

    /// Remove every entry, returning the handles in descriptor order
    pub fn drain(&self) -> Vec<(Descriptor, Arc<FileHandle>)> {
        self.descriptors()
            .into_iter()
            .filter_map(|fd| self.remove(fd).map(|handle| (fd, handle)))
            .collect()
    }
}
