use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};

use cuchol::SolveError;
use cuda_runtime_sys::{cudaErrorInitializationError, cudaErrorMemoryAllocation, cudaErrorNoDevice};
use cusolver_sys::{
    CUSOLVER_STATUS_ALLOC_FAILED, CUSOLVER_STATUS_ARCH_MISMATCH, CUSOLVER_STATUS_INVALID_VALUE,
    CUSOLVER_STATUS_MATRIX_TYPE_NOT_SUPPORTED, CUSOLVER_STATUS_NOT_INITIALIZED,
    CUSOLVER_STATUS_NOT_SUPPORTED,
};
use cusparse_sys::{
    CUSPARSE_STATUS_ALLOC_FAILED, CUSPARSE_STATUS_ARCH_MISMATCH, CUSPARSE_STATUS_INVALID_VALUE,
    CUSPARSE_STATUS_NOT_INITIALIZED, CUSPARSE_STATUS_NOT_SUPPORTED,
};
use libc::c_char;

use crate::CucholResult;

thread_local! {
    static LAST_ERROR: RefCell<Vec<u8>> = RefCell::new(Vec::new());
}

const EMPTY_ERROR: &[u8] = b"";

pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|buf| buf.borrow_mut().clear());
}

pub(crate) fn set_last_error(message: &str) {
    LAST_ERROR.with(|buf| {
        let mut bytes = message.as_bytes().to_vec();
        bytes.retain(|b| *b != 0);
        *buf.borrow_mut() = bytes;
    });
}

pub(crate) fn map_solve_error(err: &SolveError) -> CucholResult {
    match err {
        SolveError::Input(_) | SolveError::NotDeviceMemory { .. } => CucholResult::ErrorInvalidValue,
        SolveError::Singular { .. } => CucholResult::ErrorSingular,
        SolveError::Cuda(e) => match e.0 {
            cudaErrorMemoryAllocation => CucholResult::ErrorOutOfMemory,
            cudaErrorNoDevice | cudaErrorInitializationError => CucholResult::ErrorNotInitialized,
            _ => CucholResult::ErrorUnknown,
        },
        SolveError::Cusparse(e) => match e.0 {
            CUSPARSE_STATUS_NOT_INITIALIZED => CucholResult::ErrorNotInitialized,
            CUSPARSE_STATUS_ALLOC_FAILED => CucholResult::ErrorOutOfMemory,
            CUSPARSE_STATUS_INVALID_VALUE => CucholResult::ErrorInvalidValue,
            CUSPARSE_STATUS_ARCH_MISMATCH | CUSPARSE_STATUS_NOT_SUPPORTED => {
                CucholResult::ErrorNotSupported
            }
            _ => CucholResult::ErrorUnknown,
        },
        SolveError::Cusolver(e) => match e.0 {
            CUSOLVER_STATUS_NOT_INITIALIZED => CucholResult::ErrorNotInitialized,
            CUSOLVER_STATUS_ALLOC_FAILED => CucholResult::ErrorOutOfMemory,
            CUSOLVER_STATUS_INVALID_VALUE => CucholResult::ErrorInvalidValue,
            CUSOLVER_STATUS_ARCH_MISMATCH
            | CUSOLVER_STATUS_MATRIX_TYPE_NOT_SUPPORTED
            | CUSOLVER_STATUS_NOT_SUPPORTED => CucholResult::ErrorNotSupported,
            _ => CucholResult::ErrorUnknown,
        },
    }
}

/// Record `err` as the thread's last error and return its result code.
pub(crate) fn fail(context: &str, err: &SolveError) -> CucholResult {
    set_last_error(&format!("{context}: {err}"));
    map_solve_error(err)
}

/// Record a caller error that never reached the solver.
pub(crate) fn invalid(context: &str, message: &str) -> CucholResult {
    set_last_error(&format!("{context}: {message}"));
    CucholResult::ErrorInvalidValue
}

pub(crate) fn with_panic_boundary<F>(context: &str, f: F) -> CucholResult
where
    F: FnOnce() -> CucholResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(_) => {
            set_last_error(&format!("panic in {context}"));
            CucholResult::ErrorUnknown
        }
    }
}

pub(crate) fn read_utf8(ptr: *const c_char, len: usize, field: &str) -> Result<String, CucholResult> {
    if len == 0 {
        return Ok(String::new());
    }
    if ptr.is_null() {
        return Err(invalid(field, "pointer is null"));
    }

    let bytes = unsafe { std::slice::from_raw_parts(ptr as *const u8, len) };
    match std::str::from_utf8(bytes) {
        Ok(s) => Ok(s.to_string()),
        Err(_) => Err(invalid(field, "not valid UTF-8")),
    }
}

/// Borrow the calling thread's last error message.
///
/// The pointer stays valid until the next cuchol call on the same thread.
/// The message is not NUL-terminated; use `out_len`.
#[no_mangle]
pub extern "C" fn cuchol_last_error_message_utf8(
    out_ptr: *mut *const c_char,
    out_len: *mut usize,
) -> CucholResult {
    with_panic_boundary("cuchol_last_error_message_utf8", || {
        if out_ptr.is_null() || out_len.is_null() {
            return CucholResult::ErrorInvalidValue;
        }

        LAST_ERROR.with(|buf| {
            let buffer = buf.borrow();
            let bytes: &[u8] = if buffer.is_empty() { EMPTY_ERROR } else { &buffer };
            unsafe {
                *out_ptr = bytes.as_ptr() as *const c_char;
                *out_len = bytes.len();
            }
        });

        CucholResult::Success
    })
}

#[cfg(test)]
pub(crate) fn last_error() -> String {
    LAST_ERROR.with(|buf| String::from_utf8_lossy(&buf.borrow()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuchol::CholError;
    use cuda_runtime::CudaError;
    use cusolver::CusolverError;
    use cusparse::CusparseError;

    #[test]
    fn test_last_error_round_trip() {
        set_last_error("bad\0input");
        let mut ptr = std::ptr::null();
        let mut len = 0usize;
        assert_eq!(
            cuchol_last_error_message_utf8(&mut ptr, &mut len),
            CucholResult::Success
        );
        let bytes = unsafe { std::slice::from_raw_parts(ptr as *const u8, len) };
        assert_eq!(bytes, b"badinput");

        clear_last_error();
        assert_eq!(
            cuchol_last_error_message_utf8(&mut ptr, &mut len),
            CucholResult::Success
        );
        assert_eq!(len, 0);
        assert_eq!(
            cuchol_last_error_message_utf8(std::ptr::null_mut(), &mut len),
            CucholResult::ErrorInvalidValue
        );
    }

    #[test]
    fn test_error_mapping() {
        let input = SolveError::Input(CholError::NullPointer { what: "b" });
        assert_eq!(map_solve_error(&input), CucholResult::ErrorInvalidValue);
        assert_eq!(
            map_solve_error(&SolveError::Singular { row: 3 }),
            CucholResult::ErrorSingular
        );
        let oom = SolveError::Cuda(CudaError::from_code(cudaErrorMemoryAllocation));
        assert_eq!(map_solve_error(&oom), CucholResult::ErrorOutOfMemory);
        let no_dev = SolveError::Cuda(CudaError::from_code(cudaErrorNoDevice));
        assert_eq!(map_solve_error(&no_dev), CucholResult::ErrorNotInitialized);
        let arch = SolveError::Cusolver(CusolverError(CUSOLVER_STATUS_ARCH_MISMATCH));
        assert_eq!(map_solve_error(&arch), CucholResult::ErrorNotSupported);
        let alloc = SolveError::Cusparse(CusparseError(CUSPARSE_STATUS_ALLOC_FAILED));
        assert_eq!(map_solve_error(&alloc), CucholResult::ErrorOutOfMemory);
    }

    #[test]
    fn test_fail_records_context() {
        let code = fail("cuchol_solve_csr_f64", &SolveError::Singular { row: 7 });
        assert_eq!(code, CucholResult::ErrorSingular);
        assert_eq!(last_error(), "cuchol_solve_csr_f64: matrix is singular at row 7");
    }

    #[test]
    fn test_panic_boundary() {
        let code = with_panic_boundary("boom", || panic!("oops"));
        assert_eq!(code, CucholResult::ErrorUnknown);
        assert_eq!(last_error(), "panic in boom");
    }

    #[test]
    fn test_read_utf8() {
        let s = b"{\"tolerance\": 1e-10}";
        assert_eq!(
            read_utf8(s.as_ptr() as *const c_char, s.len(), "config").unwrap(),
            "{\"tolerance\": 1e-10}"
        );
        assert_eq!(read_utf8(std::ptr::null(), 0, "config").unwrap(), "");
        assert_eq!(
            read_utf8(std::ptr::null(), 4, "config").unwrap_err(),
            CucholResult::ErrorInvalidValue
        );
        let bad = [0xffu8, 0xfe];
        assert!(read_utf8(bad.as_ptr() as *const c_char, 2, "config").is_err());
    }
}
