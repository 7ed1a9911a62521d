//! Backend status domain
//!
//! Backends report failures as an [`IoStatus`]: a [`StatusCode`] from a fixed
//! domain plus a free-form message. Success is `Ok(..)`; there is no "ok"
//! status code.

use std::fmt;

/// Result type for backend operations
pub type IoResult<T> = std::result::Result<T, IoStatus>;

/// Failure codes a backend may report
///
/// Raw values follow the numbering of the RocksDB status domain so that
/// backends speaking it natively can be decoded with [`StatusCode::from_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    NotFound,
    Corruption,
    NotSupported,
    InvalidArgument,
    IoError,
    MergeInProgress,
    Incomplete,
    ShutdownInProgress,
    TimedOut,
    Aborted,
    Busy,
    Expired,
    TryAgain,
    CompactionTooLarge,
    ColumnFamilyDropped,

    /// A raw code outside the known domain
    Unrecognized(i32),
}

impl StatusCode {
    /// Decode a raw status code; `0` means success and yields `None`
    pub fn from_raw(code: i32) -> Option<Self> {
        let status = match code {
            0 => return None,
            1 => StatusCode::NotFound,
            2 => StatusCode::Corruption,
            3 => StatusCode::NotSupported,
            4 => StatusCode::InvalidArgument,
            5 => StatusCode::IoError,
            6 => StatusCode::MergeInProgress,
            7 => StatusCode::Incomplete,
            8 => StatusCode::ShutdownInProgress,
            9 => StatusCode::TimedOut,
            10 => StatusCode::Aborted,
            11 => StatusCode::Busy,
            12 => StatusCode::Expired,
            13 => StatusCode::TryAgain,
            14 => StatusCode::CompactionTooLarge,
            15 => StatusCode::ColumnFamilyDropped,
            other => StatusCode::Unrecognized(other),
        };
        Some(status)
    }

    /// Raw numeric value of this code
    pub fn as_raw(self) -> i32 {
        match self {
            StatusCode::NotFound => 1,
            StatusCode::Corruption => 2,
            StatusCode::NotSupported => 3,
            StatusCode::InvalidArgument => 4,
            StatusCode::IoError => 5,
            StatusCode::MergeInProgress => 6,
            StatusCode::Incomplete => 7,
            StatusCode::ShutdownInProgress => 8,
            StatusCode::TimedOut => 9,
            StatusCode::Aborted => 10,
            StatusCode::Busy => 11,
            StatusCode::Expired => 12,
            StatusCode::TryAgain => 13,
            StatusCode::CompactionTooLarge => 14,
            StatusCode::ColumnFamilyDropped => 15,
            StatusCode::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Unrecognized(code) => write!(f, "Unrecognized status {}", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A failed backend operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct IoStatus {
    code: StatusCode,
    message: String,
}

impl IoStatus {
    /// Create a status with an explicit code
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotFound, message)
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::IoError, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(StatusCode::InvalidArgument, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NotSupported, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Busy, message)
    }

    /// The status code
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// The backend's message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for IoStatus {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let code = match e.kind() {
            ErrorKind::NotFound => StatusCode::NotFound,
            ErrorKind::Unsupported => StatusCode::NotSupported,
            ErrorKind::InvalidInput => StatusCode::InvalidArgument,
            ErrorKind::Interrupted | ErrorKind::UnexpectedEof => StatusCode::Incomplete,
            ErrorKind::TimedOut => StatusCode::TimedOut,
            ErrorKind::WouldBlock => StatusCode::TryAgain,
            _ => StatusCode::IoError,
        };
        Self::new(code, e.to_string())
    }
}
