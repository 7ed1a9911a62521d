//! Backend status to error taxonomy mapping

use shim_core::{Error, ErrorKind};
use storage::{IoStatus, StatusCode};

/// Map a backend status code onto the harness error taxonomy
pub fn error_kind(code: StatusCode) -> ErrorKind {
    match code {
        StatusCode::NotFound => ErrorKind::NotFound,
        StatusCode::Corruption => ErrorKind::IoFault,
        StatusCode::NotSupported => ErrorKind::Unsupported,
        StatusCode::InvalidArgument => ErrorKind::InvalidArgument,
        StatusCode::IoError => ErrorKind::IoFault,
        StatusCode::Incomplete => ErrorKind::Interrupted,
        StatusCode::ShutdownInProgress => ErrorKind::BackendShuttingDown,
        StatusCode::TimedOut => ErrorKind::TimedOut,
        StatusCode::Aborted => ErrorKind::IoFault,
        StatusCode::Busy => ErrorKind::Busy,
        StatusCode::Expired => ErrorKind::TimedOut,
        StatusCode::TryAgain => ErrorKind::TransientUnavailable,
        // We don't know; stay conservative.
        StatusCode::MergeInProgress
        | StatusCode::CompactionTooLarge
        | StatusCode::ColumnFamilyDropped
        | StatusCode::Unrecognized(_) => ErrorKind::InvalidArgument,
    }
}

/// Wrap a failed backend status with the operation and path it came from
pub(crate) fn backend_error(operation: &'static str, path: &str, status: IoStatus) -> Error {
    Error::Backend {
        operation,
        path: path.to_string(),
        kind: error_kind(status.code()),
        message: status.to_string(),
    }
}
