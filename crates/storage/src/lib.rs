//! Storage - Pluggable file system backends for the fileshim adapter
//!
//! A backend is addressed by URI and hands out two kinds of streams:
//! append-only [`WritableFile`]s and positioned-read [`RandomAccessFile`]s.
//! Failures are reported in a fixed status domain ([`IoStatus`]).
//!
//! - `posix://` - local filesystem (direct I/O with the `direct_io` feature)
//! - `mem://` - in-memory namespace
//!
//! # Example
//!
//! ```no_run
//! use storage::{from_uri, FileOptions};
//!
//! # fn example() -> storage::IoResult<()> {
//! let fs = from_uri("mem://scratch")?;
//! let mut file = fs.new_writable_file("job0.0.0", &FileOptions::default())?;
//! file.append(b"payload")?;
//! file.close()?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod factory;
mod local;
mod memory;
mod status;

pub use backend::{FileOptions, FileSyncer, FileSystem, RandomAccessFile, WritableFile};
pub use factory::from_uri;
pub use local::PosixFileSystem;
pub use memory::MemoryFileSystem;
pub use status::{IoResult, IoStatus, StatusCode};
