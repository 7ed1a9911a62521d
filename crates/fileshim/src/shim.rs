//! Shim facade
//!
//! Ties the backend registry, the handle table and the file handles together
//! into the descriptor-based contract the benchmark harness drives.

use crate::handle::FileHandle;
use crate::registry::{BackendRef, BackendRegistry};
use crate::table::HandleTable;
use parking_lot::RwLock;
use shim_core::{Descriptor, Error, OpenOptions, Result, ShimConfig};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Descriptor-based file adapter over pluggable backends
#[derive(Debug)]
pub struct Shim {
    registry: BackendRegistry,
    table: HandleTable,
    config: ShimConfig,
    default_backend: RwLock<Option<BackendRef>>,
}

impl Shim {
    /// Create a shim with the default configuration and no backend
    pub fn new() -> Self {
        let config = ShimConfig::default();
        Self {
            registry: BackendRegistry::new(),
            table: HandleTable::new(config.descriptor_base),
            config,
            default_backend: RwLock::new(None),
        }
    }

    /// Create a shim from `config`, configuring its default backend if set
    pub fn from_config(config: ShimConfig) -> Result<Self> {
        Self::with_registry(config, BackendRegistry::new())
    }

    /// Create a shim from `config` over a caller-supplied registry
    pub fn with_registry(config: ShimConfig, registry: BackendRegistry) -> Result<Self> {
        config.validate()?;

        let shim = Self {
            registry,
            table: HandleTable::new(config.descriptor_base),
            config,
            default_backend: RwLock::new(None),
        };
        if let Some(uri) = shim.config.default_backend.clone() {
            shim.configure(&uri)?;
        }
        Ok(shim)
    }

    /// Get or create the backend for `uri` and make it the default for [`Shim::open`]
    #[instrument(skip(self))]
    pub fn configure(&self, uri: &str) -> Result<BackendRef> {
        let backend = self.registry.get_or_create(uri)?;
        *self.default_backend.write() = Some(backend.clone());
        info!(backend = backend.identifier(), "Default backend configured");
        Ok(backend)
    }

    /// The default backend, if one has been configured
    pub fn backend(&self) -> Option<BackendRef> {
        self.default_backend.read().clone()
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Open `path` on the default backend
    pub fn open(&self, path: &str, opts: OpenOptions) -> Result<Descriptor> {
        let backend = self.backend().ok_or_else(|| Error::InvalidConfig {
            message: "no backend configured".to_string(),
        })?;
        self.open_on(&backend, path, opts)
    }

    /// Open `path` on an explicit backend
    #[instrument(skip(self, backend), fields(backend = backend.identifier()))]
    pub fn open_on(&self, backend: &BackendRef, path: &str, opts: OpenOptions) -> Result<Descriptor> {
        let handle = FileHandle::open(backend.clone(), path, opts, self.config.short_read)
            .map_err(|e| {
                debug!(error = %e, "Open failed");
                e
            })?;
        let handle = Arc::new(handle);

        match self.table.allocate(Arc::clone(&handle)) {
            Ok(fd) => {
                debug!(%fd, "Opened");
                Ok(fd)
            }
            Err(e) => {
                if let Err(close_err) = handle.close() {
                    warn!(error = %close_err, "Failed to close unregistered handle");
                }
                Err(e)
            }
        }
    }

    /// Close `fd`; the descriptor is invalid afterwards even if closing the
    /// stream reports an error
    #[instrument(skip(self))]
    pub fn close(&self, fd: Descriptor) -> Result<()> {
        let handle = self
            .table
            .remove(fd)
            .ok_or(Error::InvalidDescriptor { fd: fd.as_raw() })?;

        handle.close().map_err(|e| {
            warn!(path = handle.path(), error = %e, "Close reported an error");
            e
        })
    }

    #[instrument(level = "trace", skip(self, buf), fields(len = buf.len()))]
    pub fn write(&self, fd: Descriptor, buf: &[u8], offset: u64) -> Result<()> {
        self.table.get(fd)?.write(buf, offset).map_err(|e| {
            debug!(error = %e, "Write failed");
            e
        })
    }

    /// Read into `buf` at `offset`, returning the number of bytes transferred
    #[instrument(level = "trace", skip(self, buf), fields(len = buf.len()))]
    pub fn read(&self, fd: Descriptor, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.table.get(fd)?.read(buf, offset).map_err(|e| {
            debug!(error = %e, "Read failed");
            e
        })
    }

    /// Flush `fd`; `metadata` selects a full sync over a data-only one
    #[instrument(level = "trace", skip(self))]
    pub fn sync(&self, fd: Descriptor, metadata: bool) -> Result<()> {
        self.table.get(fd)?.sync(metadata).map_err(|e| {
            debug!(error = %e, "Sync failed");
            e
        })
    }

    #[instrument(level = "trace", skip(self))]
    pub fn invalidate(&self, fd: Descriptor) -> Result<()> {
        self.table.get(fd)?.invalidate().map_err(|e| {
            debug!(error = %e, "Invalidate failed");
            e
        })
    }

    /// Number of open descriptors
    pub fn open_files(&self) -> usize {
        self.table.len()
    }

    /// Close every open handle, returning how many were closed
    pub fn shutdown(&self) -> usize {
        let handles = self.table.drain();
        let count = handles.len();
        for (fd, handle) in handles {
            if let Err(e) = handle.close() {
                warn!(%fd, path = handle.path(), error = %e, "Close during shutdown failed");
            }
        }
        if count > 0 {
            info!(count, "Closed remaining handles");
        }
        count
    }
}

impl Default for Shim {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Shim {
    fn drop(&mut self) {
        self.shutdown();
    }
}
