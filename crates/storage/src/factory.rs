//! URI-addressed backend construction
//!
//! Supported schemes:
//! - `posix://[root]` - local filesystem, optionally rooted at a directory
//! - `mem://[namespace]` - fresh in-memory namespace

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{FileSystem, IoResult, IoStatus, MemoryFileSystem, PosixFileSystem};

/// Split `scheme://rest` into its parts
fn split_uri(uri: &str) -> IoResult<(&str, &str)> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| IoStatus::invalid_argument(format!("malformed backend URI: {:?}", uri)))?;
    if scheme.is_empty() {
        return Err(IoStatus::invalid_argument(format!(
            "backend URI has no scheme: {:?}",
            uri
        )));
    }
    Ok((scheme, rest))
}

/// Create a backend instance from its URI
///
/// Every call constructs a new instance; sharing instances per URI is the
/// caller's concern.
pub fn from_uri(uri: &str) -> IoResult<Arc<dyn FileSystem>> {
    let (scheme, rest) = split_uri(uri)?;

    let fs: Arc<dyn FileSystem> = match scheme {
        "posix" if rest.is_empty() => Arc::new(PosixFileSystem::new()),
        "posix" => {
            if !Path::new(rest).is_dir() {
                return Err(IoStatus::invalid_argument(format!(
                    "posix root is not a directory: {}",
                    rest
                )));
            }
            Arc::new(PosixFileSystem::with_root(rest))
        }
        "mem" if rest.is_empty() => Arc::new(MemoryFileSystem::new(Uuid::new_v4().to_string())),
        "mem" => Arc::new(MemoryFileSystem::new(rest)),
        other => {
            return Err(IoStatus::not_supported(format!(
                "unknown backend scheme: {}",
                other
            )))
        }
    };

    info!(uri, backend = fs.name(), "Backend created");
    Ok(fs)
}
