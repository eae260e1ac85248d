//! Raw FFI bindings to the cuSOLVER sparse (`cusolverSp`) API.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use cuda_runtime_sys::cudaStream_t;
use cusparse_sys::cusparseMatDescr_t;
use libc::c_int;

pub type cusolverStatus_t = c_int;
pub const CUSOLVER_STATUS_SUCCESS: cusolverStatus_t = 0;
pub const CUSOLVER_STATUS_NOT_INITIALIZED: cusolverStatus_t = 1;
pub const CUSOLVER_STATUS_ALLOC_FAILED: cusolverStatus_t = 2;
pub const CUSOLVER_STATUS_INVALID_VALUE: cusolverStatus_t = 3;
pub const CUSOLVER_STATUS_ARCH_MISMATCH: cusolverStatus_t = 4;
pub const CUSOLVER_STATUS_EXECUTION_FAILED: cusolverStatus_t = 5;
pub const CUSOLVER_STATUS_INTERNAL_ERROR: cusolverStatus_t = 6;
pub const CUSOLVER_STATUS_MATRIX_TYPE_NOT_SUPPORTED: cusolverStatus_t = 7;
pub const CUSOLVER_STATUS_NOT_SUPPORTED: cusolverStatus_t = 8;

#[repr(C)]
pub struct cusolverSpContext { _unused: [u8; 0] }
pub type cusolverSpHandle_t = *mut cusolverSpContext;

// `reorder` argument of the csrlsv* family.
pub const CUSOLVER_SP_REORDER_NONE: c_int = 0;
pub const CUSOLVER_SP_REORDER_SYMRCM: c_int = 1;
pub const CUSOLVER_SP_REORDER_SYMAMD: c_int = 2;
pub const CUSOLVER_SP_REORDER_CSRMETISND: c_int = 3;

extern "C" {
    // Sparse handle
    pub fn cusolverSpCreate(handle: *mut cusolverSpHandle_t) -> cusolverStatus_t;
    pub fn cusolverSpDestroy(handle: cusolverSpHandle_t) -> cusolverStatus_t;
    pub fn cusolverSpSetStream(handle: cusolverSpHandle_t, streamId: cudaStream_t) -> cusolverStatus_t;

    // Sparse Cholesky linear solve, device pointers
    pub fn cusolverSpScsrlsvchol(
        handle: cusolverSpHandle_t,
        m: c_int,
        nnz: c_int,
        descrA: cusparseMatDescr_t,
        csrVal: *const f32,
        csrRowPtr: *const c_int,
        csrColInd: *const c_int,
        b: *const f32,
        tol: f32,
        reorder: c_int,
        x: *mut f32,
        singularity: *mut c_int,
    ) -> cusolverStatus_t;

    pub fn cusolverSpDcsrlsvchol(
        handle: cusolverSpHandle_t,
        m: c_int,
        nnz: c_int,
        descrA: cusparseMatDescr_t,
        csrVal: *const f64,
        csrRowPtr: *const c_int,
        csrColInd: *const c_int,
        b: *const f64,
        tol: f64,
        reorder: c_int,
        x: *mut f64,
        singularity: *mut c_int,
    ) -> cusolverStatus_t;
}
