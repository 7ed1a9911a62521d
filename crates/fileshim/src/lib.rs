//! Fileshim - Synchronous file adapter for I/O benchmarking harnesses
//!
//! Presents a descriptor-based API (open, write, read, sync, invalidate,
//! close) and forwards each call to a pluggable storage backend selected by
//! URI. Backends are created once per URI and shared by every file opened
//! on them.
//!
//! # Example
//!
//! ```
//! use fileshim::{OpenOptions, Shim};
//!
//! # fn example() -> fileshim::Result<()> {
//! let shim = Shim::new();
//! shim.configure("mem://bench")?;
//!
//! let fd = shim.open("job0.0.0", OpenOptions::read_write())?;
//! shim.write(fd, b"payload", 0)?;
//!
//! let mut buf = [0u8; 7];
//! assert_eq!(shim.read(fd, &mut buf, 0)?, 7);
//! shim.close(fd)?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod handle;
pub mod registry;
pub mod shim;
pub mod status;
pub mod table;

#[cfg(test)]
mod testing;

pub use handle::FileHandle;
pub use registry::{BackendFactory, BackendRef, BackendRegistry};
pub use shim::Shim;
pub use status::error_kind;
pub use table::HandleTable;

pub use shim_core::{Descriptor, Error, ErrorKind, OpenOptions, Result, ShimConfig, ShortReadPolicy};
