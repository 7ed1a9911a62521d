//! Core type definitions shared by the adapter and its C boundary

use serde::{Deserialize, Serialize};
use std::fmt;

/// Adapter-issued integer handle identifying one open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Descriptor(i32);

impl Descriptor {
    /// Wrap a raw descriptor value received from the harness
    pub fn from_raw(fd: i32) -> Self {
        Self(fd)
    }

    /// Raw value handed to the harness
    pub fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Capabilities requested when opening a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Open a read stream
    pub read: bool,

    /// Open a write stream
    pub write: bool,

    /// Ask the backend to bypass page-cache buffering
    pub direct: bool,
}

impl OpenOptions {
    /// Options for reading an existing file
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Options for writing a file sequentially
    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Self::default()
        }
    }

    /// Options for a mixed read/write workload
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Self::default()
        }
    }

    /// Set the direct I/O hint
    pub fn direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }
}
