//! Shim Core - Foundation for the fileshim I/O adapter
//!
//! Provides the error taxonomy surfaced to the benchmarking harness,
//! configuration, shared handle types and logging bootstrap.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{LoggingConfig, ShimConfig, ShortReadPolicy};
pub use error::{Error, ErrorKind, Result};
pub use types::{Descriptor, OpenOptions};
