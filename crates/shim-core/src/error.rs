//! Error types for the fileshim I/O adapter
//!
//! Every failure carries enough context to be logged, and projects onto a
//! small [`ErrorKind`] taxonomy whose negative errno-style codes are what the
//! benchmarking harness finally sees.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the shim Error
pub type Result<T> = std::result::Result<T, Error>;

// Linux errno values used by the harness error-reporting convention.
const ENOENT: i32 = 2;
const EINTR: i32 = 4;
const EIO: i32 = 5;
const EBADF: i32 = 9;
const EAGAIN: i32 = 11;
const EACCES: i32 = 13;
const EFAULT: i32 = 14;
const EBUSY: i32 = 16;
const EINVAL: i32 = 22;
const ESPIPE: i32 = 29;
const EROFS: i32 = 30;
const ETIME: i32 = 62;
const ENOTSUP: i32 = 95;
const ESHUTDOWN: i32 = 108;

/// The numeric error space callers can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Backend identifier rejected or nothing configured
    InvalidConfiguration,

    /// Descriptor unknown, already closed, or closing
    InvalidDescriptor,

    /// Handle was not opened for reading
    NoReadCapability,

    /// Handle was not opened for writing
    NoWriteCapability,

    /// Write offset does not match the handle's write cursor
    OutOfOrderWrite,

    /// Backend reported a missing file
    NotFound,

    /// Backend I/O, corruption or abort
    IoFault,

    /// Backend does not support the operation
    Unsupported,

    /// Backend rejected an argument, or status was not recognized
    InvalidArgument,

    /// Backend operation did not complete
    Interrupted,

    /// Backend is shutting down
    BackendShuttingDown,

    /// Backend operation timed out or expired
    TimedOut,

    /// Backend resource is busy
    Busy,

    /// Backend asked the caller to try again
    TransientUnavailable,

    /// Backend returned data outside the caller's buffer
    BackendDataMisplaced,
}

impl ErrorKind {
    /// All error kinds, in taxonomy order
    pub const ALL: [ErrorKind; 15] = [
        ErrorKind::InvalidConfiguration,
        ErrorKind::InvalidDescriptor,
        ErrorKind::NoReadCapability,
        ErrorKind::NoWriteCapability,
        ErrorKind::OutOfOrderWrite,
        ErrorKind::NotFound,
        ErrorKind::IoFault,
        ErrorKind::Unsupported,
        ErrorKind::InvalidArgument,
        ErrorKind::Interrupted,
        ErrorKind::BackendShuttingDown,
        ErrorKind::TimedOut,
        ErrorKind::Busy,
        ErrorKind::TransientUnavailable,
        ErrorKind::BackendDataMisplaced,
    ];

    /// Negative errno-style code reported across the C boundary
    pub fn errno(self) -> i32 {
        let code = match self {
            ErrorKind::InvalidConfiguration => EINVAL,
            ErrorKind::InvalidDescriptor => EBADF,
            ErrorKind::NoReadCapability => EACCES,
            ErrorKind::NoWriteCapability => EROFS,
            ErrorKind::OutOfOrderWrite => ESPIPE,
            ErrorKind::NotFound => ENOENT,
            ErrorKind::IoFault => EIO,
            ErrorKind::Unsupported => ENOTSUP,
            ErrorKind::InvalidArgument => EINVAL,
            ErrorKind::Interrupted => EINTR,
            ErrorKind::BackendShuttingDown => ESHUTDOWN,
            ErrorKind::TimedOut => ETIME,
            ErrorKind::Busy => EBUSY,
            ErrorKind::TransientUnavailable => EAGAIN,
            ErrorKind::BackendDataMisplaced => EFAULT,
        };
        -code
    }

    /// Returns true if the harness may reasonably retry the operation
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Interrupted
                | ErrorKind::TimedOut
                | ErrorKind::Busy
                | ErrorKind::TransientUnavailable
        )
    }
}

/// Core error type for the fileshim adapter
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Backend unavailable: {identifier} ({message})")]
    BackendUnavailable { identifier: String, message: String },

    // Descriptor errors
    #[error("Invalid descriptor: {fd}")]
    InvalidDescriptor { fd: i32 },

    #[error("File handle closed: {path}")]
    HandleClosed { path: String },

    #[error("Descriptor space exhausted")]
    DescriptorsExhausted,

    // Capability errors
    #[error("File not open for reading: {path}")]
    NotReadable { path: String },

    #[error("File not open for writing: {path}")]
    NotWritable { path: String },

    #[error("Out of order write to {path}: expected offset {expected}, got {actual}")]
    OutOfOrderWrite {
        path: String,
        expected: u64,
        actual: u64,
    },

    // Read contract errors
    #[error("Backend placed data outside the caller buffer: {path} at offset {offset}")]
    DataMisplaced { path: String, offset: u64 },

    #[error("Short read from {path} at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: String,
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    // Mapped backend status
    #[error("{operation} failed on {path}: {message}")]
    Backend {
        operation: &'static str,
        path: String,
        kind: ErrorKind,
        message: String,
    },
}

impl Error {
    /// Project this error onto the harness taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidConfig { .. } | Error::BackendUnavailable { .. } => {
                ErrorKind::InvalidConfiguration
            }
            Error::InvalidDescriptor { .. } | Error::HandleClosed { .. } => {
                ErrorKind::InvalidDescriptor
            }
            Error::DescriptorsExhausted => ErrorKind::Busy,
            Error::NotReadable { .. } => ErrorKind::NoReadCapability,
            Error::NotWritable { .. } => ErrorKind::NoWriteCapability,
            Error::OutOfOrderWrite { .. } => ErrorKind::OutOfOrderWrite,
            Error::DataMisplaced { .. } => ErrorKind::BackendDataMisplaced,
            Error::ShortRead { .. } => ErrorKind::IoFault,
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::Backend { kind, .. } => *kind,
        }
    }

    /// Negative errno-style code for this error
    pub fn errno(&self) -> i32 {
        self.kind().errno()
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidConfig {
            message: e.to_string(),
        }
    }
}
