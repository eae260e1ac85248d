//! cuchol FFI - C interface to the GPU sparse Cholesky solver.
//!
//! All matrix and vector pointers passed to the solve functions are device
//! pointers; the library never copies them to the host. Functions return a
//! [`CucholResult`], and a human-readable message for the last failure on the
//! calling thread is available through `cuchol_last_error_message_utf8`.

#![allow(clippy::missing_safety_doc)]

use libc::c_char;

mod error;
mod solve;
mod solver;

pub use error::*;
pub use solve::*;
pub use solver::*;

/// Result code for all cuchol operations.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CucholResult {
    Success = 0,
    ErrorInvalidValue = 1,
    ErrorOutOfMemory = 2,
    ErrorNotInitialized = 3,
    ErrorInvalidHandle = 4,
    ErrorNotSupported = 5,
    ErrorSingular = 6,
    ErrorUnknown = 999,
}

/// Get the version string of the library.
#[no_mangle]
pub extern "C" fn cuchol_get_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get a static description of a result code.
#[no_mangle]
pub extern "C" fn cuchol_get_error_string(result: CucholResult) -> *const c_char {
    match result {
        CucholResult::Success => b"Success\0".as_ptr() as *const c_char,
        CucholResult::ErrorInvalidValue => b"Invalid value\0".as_ptr() as *const c_char,
        CucholResult::ErrorOutOfMemory => b"Out of memory\0".as_ptr() as *const c_char,
        CucholResult::ErrorNotInitialized => b"Not initialized\0".as_ptr() as *const c_char,
        CucholResult::ErrorInvalidHandle => b"Invalid handle\0".as_ptr() as *const c_char,
        CucholResult::ErrorNotSupported => b"Not supported\0".as_ptr() as *const c_char,
        CucholResult::ErrorSingular => b"Matrix is singular\0".as_ptr() as *const c_char,
        CucholResult::ErrorUnknown => b"Unknown error\0".as_ptr() as *const c_char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_version_matches_package() {
        let v = unsafe { CStr::from_ptr(cuchol_get_version()) };
        assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_error_strings() {
        let s = unsafe { CStr::from_ptr(cuchol_get_error_string(CucholResult::ErrorSingular)) };
        assert_eq!(s.to_str().unwrap(), "Matrix is singular");
        let s = unsafe { CStr::from_ptr(cuchol_get_error_string(CucholResult::Success)) };
        assert_eq!(s.to_str().unwrap(), "Success");
    }
}
