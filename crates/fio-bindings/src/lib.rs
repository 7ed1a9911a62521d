//! C ABI for fio external engines
//!
//! Exposes the fileshim contract as `extern "C"` functions over one
//! process-wide [`Shim`]. Every function returns a negative errno-style code
//! on failure; [`fileshim_last_error`] gives the message for the calling
//! thread. Panics never cross the boundary.
//!
//! ```c
//! if (fileshim_configure("posix:///mnt/nvme") < 0)
//!     fprintf(stderr, "%s\n", fileshim_last_error());
//! int fd = fileshim_open("job0.0.0", false, true, true);
//! fileshim_write(fd, buf, 4096, 0);
//! fileshim_read(fd, buf, 4096, 0);
//! fileshim_close(fd);
//! ```

mod error;

pub use error::fileshim_last_error;

use fileshim::Shim;
use shim_core::{logging, Descriptor, Error, ErrorKind, OpenOptions, Result, ShimConfig};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::slice;
use std::sync::{Once, OnceLock};
use tracing::warn;

static SHIM: OnceLock<Shim> = OnceLock::new();
static LOGGING: Once = Once::new();

fn shim() -> &'static Shim {
    SHIM.get_or_init(|| {
        let loaded = ShimConfig::from_env();
        let config = loaded.as_ref().cloned().unwrap_or_default();
        init_logging(&config);
        if let Err(e) = &loaded {
            error::set_message(&e.to_string());
            warn!(error = %e, "Ignoring invalid environment configuration, using defaults");
        }
        build_shim(config)
    })
}

/// Build the process-wide shim, keeping `config` even when its default
/// backend cannot be created
fn build_shim(config: ShimConfig) -> Shim {
    let Some(uri) = config.default_backend.clone() else {
        return Shim::from_config(config).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            Shim::new()
        });
    };

    let fallback = ShimConfig {
        default_backend: None,
        ..config.clone()
    };
    match Shim::from_config(config) {
        Ok(shim) => shim,
        Err(e) => {
            error::set_message(&e.to_string());
            warn!(
                backend = %uri,
                error = %e,
                "Default backend unavailable, waiting for fileshim_configure"
            );
            Shim::from_config(fallback).unwrap_or_else(|e| {
                warn!(error = %e, "Invalid configuration, using defaults");
                Shim::new()
            })
        }
    }
}

fn init_logging(config: &ShimConfig) {
    LOGGING.call_once(|| {
        logging::init(&config.logging);
    });
}

/// Run `f`, converting errors and panics to negative codes
fn guard<F>(f: F) -> i64
where
    F: FnOnce() -> Result<i64>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => i64::from(error::record(&e)),
        Err(_) => {
            error::set_message("internal panic in fileshim");
            i64::from(ErrorKind::IoFault.errno())
        }
    }
}

/// Narrow a result that always fits in a C int
fn guard_int<F>(f: F) -> c_int
where
    F: FnOnce() -> Result<i64>,
{
    c_int::try_from(guard(f)).unwrap_or(ErrorKind::IoFault.errno())
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string valid for the call.
unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::InvalidArgument {
            message: format!("{} is null", what),
        });
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| Error::InvalidArgument {
        message: format!("{} is not valid UTF-8", what),
    })
}

fn buffer_len(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| Error::InvalidArgument {
        message: format!("buffer length {} exceeds address space", len),
    })
}

/// Select the backend used by later `fileshim_open` calls
///
/// # Safety
///
/// `uri` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fileshim_configure(uri: *const c_char) -> c_int {
    guard_int(|| {
        let uri = c_str(uri, "backend URI")?;
        let shim = shim();
        init_logging(shim.config());
        shim.configure(uri)?;
        Ok(0)
    })
}

/// Open `path` on the configured backend, returning a descriptor
///
/// # Safety
///
/// `path` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn fileshim_open(
    path: *const c_char,
    direct: bool,
    read: bool,
    write: bool,
) -> c_int {
    guard_int(|| {
        let path = c_str(path, "path")?;
        let opts = OpenOptions {
            read,
            write,
            direct,
        };
        let fd = shim().open(path, opts)?;
        Ok(i64::from(fd.as_raw()))
    })
}

#[no_mangle]
pub extern "C" fn fileshim_close(fd: c_int) -> c_int {
    guard_int(|| {
        shim().close(Descriptor::from_raw(fd))?;
        Ok(0)
    })
}

/// Write `len` bytes from `buf` at `offset`
///
/// # Safety
///
/// `buf` must be valid for reads of `len` bytes, or null when `len` is 0.
#[no_mangle]
pub unsafe extern "C" fn fileshim_write(
    fd: c_int,
    buf: *const c_void,
    len: u64,
    offset: u64,
) -> c_int {
    guard_int(|| {
        let len = buffer_len(len)?;
        let data: &[u8] = if len == 0 {
            &[]
        } else if buf.is_null() {
            return Err(Error::InvalidArgument {
                message: "write buffer is null".to_string(),
            });
        } else {
            // SAFETY: non-null and valid for `len` bytes per the contract above.
            slice::from_raw_parts(buf.cast::<u8>(), len)
        };
        shim().write(Descriptor::from_raw(fd), data, offset)?;
        Ok(0)
    })
}

/// Read up to `len` bytes at `offset` into `buf`, returning the count
///
/// # Safety
///
/// `buf` must be valid for writes of `len` bytes, or null when `len` is 0.
#[no_mangle]
pub unsafe extern "C" fn fileshim_read(fd: c_int, buf: *mut c_void, len: u64, offset: u64) -> i64 {
    guard(|| {
        let len = buffer_len(len)?;
        let data: &mut [u8] = if len == 0 {
            &mut []
        } else if buf.is_null() {
            return Err(Error::InvalidArgument {
                message: "read buffer is null".to_string(),
            });
        } else {
            // SAFETY: non-null, valid for `len` bytes and exclusively ours
            // for the duration of the call per the contract above.
            slice::from_raw_parts_mut(buf.cast::<u8>(), len)
        };
        let n = shim().read(Descriptor::from_raw(fd), data, offset)?;
        Ok(n as i64)
    })
}

/// Flush data and metadata
#[no_mangle]
pub extern "C" fn fileshim_sync(fd: c_int) -> c_int {
    guard_int(|| {
        shim().sync(Descriptor::from_raw(fd), true)?;
        Ok(0)
    })
}

/// Flush data only
#[no_mangle]
pub extern "C" fn fileshim_datasync(fd: c_int) -> c_int {
    guard_int(|| {
        shim().sync(Descriptor::from_raw(fd), false)?;
        Ok(0)
    })
}

#[no_mangle]
pub extern "C" fn fileshim_invalidate(fd: c_int) -> c_int {
    guard_int(|| {
        shim().invalidate(Descriptor::from_raw(fd))?;
        Ok(0)
    })
}
