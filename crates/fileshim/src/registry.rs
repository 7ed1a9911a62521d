//! Backend registry
//!
//! Maps a backend identifier (URI) to one lazily created, shared backend
//! instance. Each identifier owns a slot with its own lock: the registry
//! lock only guards the map structure, while construction for a given
//! identifier serializes on its slot so racing callers converge on a single
//! instance.

use parking_lot::Mutex;
use shim_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use storage::{FileSystem, IoResult};
use tracing::{debug, info, warn};

/// Constructor for backend instances, keyed by identifier
pub type BackendFactory = dyn Fn(&str) -> IoResult<Arc<dyn FileSystem>> + Send + Sync;

/// Typed, shared reference to a backend instance
#[derive(Clone)]
pub struct BackendRef {
    identifier: Arc<str>,
    fs: Arc<dyn FileSystem>,
}

impl BackendRef {
    /// Wrap an existing backend instance
    pub fn new(identifier: &str, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            identifier: Arc::from(identifier),
            fs,
        }
    }

    /// Identifier the backend was created from
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The backend capability
    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Returns true if both references point at the same instance
    pub fn same_instance(&self, other: &BackendRef) -> bool {
        Arc::ptr_eq(&self.fs, &other.fs)
    }
}

impl fmt::Debug for BackendRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRef")
            .field("identifier", &self.identifier)
            .field("backend", &self.fs.name())
            .finish()
    }
}

type Slot = Arc<Mutex<Option<BackendRef>>>;

/// Thread-safe backend registry
pub struct BackendRegistry {
    /// Map of identifier to its construction slot
    backends: Mutex<HashMap<String, Slot>>,

    /// Backend constructor
    factory: Box<BackendFactory>,
}

impl BackendRegistry {
    /// Create a registry using the URI factory from `storage`
    pub fn new() -> Self {
        Self::with_factory(storage::from_uri)
    }

    /// Create a registry with a custom backend factory
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&str) -> IoResult<Arc<dyn FileSystem>> + Send + Sync + 'static,
    {
        Self {
            backends: Mutex::new(HashMap::new()),
            factory: Box::new(factory),
        }
    }

    /// Get the backend for `identifier`, constructing it on first use
    pub fn get_or_create(&self, identifier: &str) -> Result<BackendRef> {
        if identifier.is_empty() {
            return Err(Error::InvalidConfig {
                message: "backend identifier must not be empty".to_string(),
            });
        }

        loop {
            let slot = {
                let mut backends = self.backends.lock();
                Arc::clone(backends.entry(identifier.to_string()).or_default())
            };

            // Lock order is slot then map; the map lock is never held while
            // waiting on a slot.
            let mut instance = slot.lock();
            if !self.is_current(identifier, &slot) {
                // Discarded by a failed construction while we waited.
                continue;
            }
            if let Some(backend) = instance.as_ref() {
                debug!(identifier, "Backend registry hit");
                return Ok(backend.clone());
            }

            return match (self.factory)(identifier) {
                Ok(fs) => {
                    let backend = BackendRef::new(identifier, fs);
                    *instance = Some(backend.clone());
                    info!(identifier, backend = backend.fs().name(), "Backend registered");
                    Ok(backend)
                }
                Err(status) => {
                    // Removed under the slot guard so waiters see it is stale.
                    self.backends.lock().remove(identifier);
                    drop(instance);
                    warn!(identifier, error = %status, "Backend factory rejected identifier");
                    Err(Error::BackendUnavailable {
                        identifier: identifier.to_string(),
                        message: status.to_string(),
                    })
                }
            };
        }
    }

    /// Returns true if the map still points `identifier` at `slot`
    fn is_current(&self, identifier: &str, slot: &Slot) -> bool {
        self.backends
            .lock()
            .get(identifier)
            .is_some_and(|existing| Arc::ptr_eq(existing, slot))
    }

    /// Get an already constructed backend
    pub fn get(&self, identifier: &str) -> Option<BackendRef> {
        let slot = self.backends.lock().get(identifier).cloned()?;
        let instance = slot.lock();
        instance.clone()
    }

    /// Returns true if a backend exists for `identifier`
    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    /// Identifiers of all constructed backends, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = self
            .backends
            .lock()
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();

        let mut ids: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| slot.lock().is_some())
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Number of constructed backends
    pub fn len(&self) -> usize {
        self.identifiers().len()
    }

    /// Returns true if no backend has been constructed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}
