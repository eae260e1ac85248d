//! Safe Rust wrapper for the cuSOLVER sparse API.

use cuda_runtime::Stream;
use cusolver_sys::*;
use cusparse::MatDescr;
use libc::c_int;
use std::ptr;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cuSOLVER Error: {0} ({})", status_name(*.0))]
pub struct CusolverError(pub i32);

pub type Result<T> = std::result::Result<T, CusolverError>;

#[inline]
fn check(code: cusolverStatus_t) -> Result<()> {
    if code == CUSOLVER_STATUS_SUCCESS {
        Ok(())
    } else {
        Err(CusolverError(code))
    }
}

/// Symbolic name of a cuSOLVER status code.
pub fn status_name(code: i32) -> &'static str {
    match code {
        CUSOLVER_STATUS_SUCCESS => "CUSOLVER_STATUS_SUCCESS",
        CUSOLVER_STATUS_NOT_INITIALIZED => "CUSOLVER_STATUS_NOT_INITIALIZED",
        CUSOLVER_STATUS_ALLOC_FAILED => "CUSOLVER_STATUS_ALLOC_FAILED",
        CUSOLVER_STATUS_INVALID_VALUE => "CUSOLVER_STATUS_INVALID_VALUE",
        CUSOLVER_STATUS_ARCH_MISMATCH => "CUSOLVER_STATUS_ARCH_MISMATCH",
        CUSOLVER_STATUS_EXECUTION_FAILED => "CUSOLVER_STATUS_EXECUTION_FAILED",
        CUSOLVER_STATUS_INTERNAL_ERROR => "CUSOLVER_STATUS_INTERNAL_ERROR",
        CUSOLVER_STATUS_MATRIX_TYPE_NOT_SUPPORTED => "CUSOLVER_STATUS_MATRIX_TYPE_NOT_SUPPORTED",
        CUSOLVER_STATUS_NOT_SUPPORTED => "CUSOLVER_STATUS_NOT_SUPPORTED",
        _ => "CUSOLVER_STATUS_UNKNOWN",
    }
}

/// Fill-reducing ordering applied inside `csrlsvchol` before factorizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reorder {
    #[default]
    None,
    Symrcm,
    Symamd,
    Metis,
}

impl Reorder {
    pub fn to_cusolver(self) -> c_int {
        match self {
            Reorder::None => CUSOLVER_SP_REORDER_NONE,
            Reorder::Symrcm => CUSOLVER_SP_REORDER_SYMRCM,
            Reorder::Symamd => CUSOLVER_SP_REORDER_SYMAMD,
            Reorder::Metis => CUSOLVER_SP_REORDER_CSRMETISND,
        }
    }
}

/// Element types with a cusolverSp Cholesky entry point.
pub trait SpCholScalar: Copy + Send + Sync + 'static {
    /// Short precision tag used in diagnostics ("S" or "D").
    const PREFIX: &'static str;

    /// # Safety
    /// Every pointer must address device memory of the documented length:
    /// `values`/`col_ind` hold `nnz` elements, `row_ptr` holds `m + 1`,
    /// `b` and `x` hold `m`.
    #[allow(clippy::too_many_arguments)]
    unsafe fn csrlsvchol(
        handle: cusolverSpHandle_t,
        m: c_int,
        nnz: c_int,
        descr: &MatDescr,
        values: *const Self,
        row_ptr: *const c_int,
        col_ind: *const c_int,
        b: *const Self,
        tol: f64,
        reorder: c_int,
        x: *mut Self,
        singularity: *mut c_int,
    ) -> cusolverStatus_t;
}

impl SpCholScalar for f32 {
    const PREFIX: &'static str = "S";

    unsafe fn csrlsvchol(
        handle: cusolverSpHandle_t,
        m: c_int,
        nnz: c_int,
        descr: &MatDescr,
        values: *const f32,
        row_ptr: *const c_int,
        col_ind: *const c_int,
        b: *const f32,
        tol: f64,
        reorder: c_int,
        x: *mut f32,
        singularity: *mut c_int,
    ) -> cusolverStatus_t {
        cusolverSpScsrlsvchol(
            handle,
            m,
            nnz,
            descr.as_raw(),
            values,
            row_ptr,
            col_ind,
            b,
            tol as f32,
            reorder,
            x,
            singularity,
        )
    }
}

impl SpCholScalar for f64 {
    const PREFIX: &'static str = "D";

    unsafe fn csrlsvchol(
        handle: cusolverSpHandle_t,
        m: c_int,
        nnz: c_int,
        descr: &MatDescr,
        values: *const f64,
        row_ptr: *const c_int,
        col_ind: *const c_int,
        b: *const f64,
        tol: f64,
        reorder: c_int,
        x: *mut f64,
        singularity: *mut c_int,
    ) -> cusolverStatus_t {
        cusolverSpDcsrlsvchol(
            handle,
            m,
            nnz,
            descr.as_raw(),
            values,
            row_ptr,
            col_ind,
            b,
            tol,
            reorder,
            x,
            singularity,
        )
    }
}

/// cuSOLVER Sparse Handle wrapper with automatic resource management.
pub struct SpHandle {
    handle: cusolverSpHandle_t,
}

impl SpHandle {
    /// Create a new cuSOLVER sparse handle.
    pub fn new() -> Result<Self> {
        let mut handle = ptr::null_mut();
        unsafe { check(cusolverSpCreate(&mut handle))? };
        Ok(Self { handle })
    }

    /// Set the stream for this handle.
    pub fn set_stream(&self, stream: &Stream) -> Result<()> {
        unsafe { check(cusolverSpSetStream(self.handle, stream.as_raw())) }
    }

    /// Solve `A x = b` for symmetric positive definite `A` in CSR form.
    ///
    /// Returns the `singularity` output: `-1` if `A` is positive definite to
    /// within `tol`, otherwise the first row where factorization broke down.
    ///
    /// # Safety
    /// See [`SpCholScalar::csrlsvchol`].
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn csrlsvchol<T: SpCholScalar>(
        &self,
        m: i32,
        nnz: i32,
        descr: &MatDescr,
        values: *const T,
        row_ptr: *const i32,
        col_ind: *const i32,
        b: *const T,
        tol: f64,
        reorder: Reorder,
        x: *mut T,
    ) -> Result<i32> {
        let mut singularity: c_int = -1;
        check(T::csrlsvchol(
            self.handle,
            m,
            nnz,
            descr,
            values,
            row_ptr,
            col_ind,
            b,
            tol,
            reorder.to_cusolver(),
            x,
            &mut singularity,
        ))?;
        Ok(singularity)
    }

    /// Get the raw handle.
    pub fn as_raw(&self) -> cusolverSpHandle_t {
        self.handle
    }
}

impl Drop for SpHandle {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { cusolverSpDestroy(self.handle) };
        }
    }
}

unsafe impl Send for SpHandle {}
unsafe impl Sync for SpHandle {}
