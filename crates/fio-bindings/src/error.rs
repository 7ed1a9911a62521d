//! Last-error reporting for C callers
//!
//! Each thread keeps the message of its most recent failure so concurrent
//! fio jobs never see each other's errors.

use shim_core::Error;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store `error` as this thread's last error and return its code
pub(crate) fn record(error: &Error) -> i32 {
    set_message(&error.to_string());
    error.errno()
}

pub(crate) fn set_message(msg: &str) {
    // Interior NULs would truncate the C string; drop them instead.
    let sanitized: String = msg.chars().filter(|c| *c != '\0').collect();
    LAST_ERROR.with(|err| {
        *err.borrow_mut() = CString::new(sanitized).ok();
    });
}

/// Message of the last failure on the calling thread, or NULL
///
/// The pointer stays valid until the next failing call on this thread and
/// must not be freed by the caller.
#[no_mangle]
pub extern "C" fn fileshim_last_error() -> *const c_char {
    LAST_ERROR.with(|err| {
        err.borrow()
            .as_ref()
            .map_or(std::ptr::null(), |msg| msg.as_ptr())
    })
}
