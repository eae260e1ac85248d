//! Raw FFI bindings to the cuSPARSE legacy matrix descriptor API.
//!
//! cuSOLVER's sparse routines still take a `cusparseMatDescr_t`; only the
//! descriptor lifecycle and its type and index-base setters are bound here.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]

use libc::c_int;

pub type cusparseStatus_t = c_int;
pub const CUSPARSE_STATUS_SUCCESS: cusparseStatus_t = 0;
pub const CUSPARSE_STATUS_NOT_INITIALIZED: cusparseStatus_t = 1;
pub const CUSPARSE_STATUS_ALLOC_FAILED: cusparseStatus_t = 2;
pub const CUSPARSE_STATUS_INVALID_VALUE: cusparseStatus_t = 3;
pub const CUSPARSE_STATUS_ARCH_MISMATCH: cusparseStatus_t = 4;
pub const CUSPARSE_STATUS_EXECUTION_FAILED: cusparseStatus_t = 6;
pub const CUSPARSE_STATUS_INTERNAL_ERROR: cusparseStatus_t = 7;
pub const CUSPARSE_STATUS_MATRIX_TYPE_NOT_SUPPORTED: cusparseStatus_t = 8;
pub const CUSPARSE_STATUS_NOT_SUPPORTED: cusparseStatus_t = 9;
pub const CUSPARSE_STATUS_INSUFFICIENT_RESOURCES: cusparseStatus_t = 10;

#[repr(C)]
pub struct cusparseMatDescr { _unused: [u8; 0] }
pub type cusparseMatDescr_t = *mut cusparseMatDescr;

pub type cusparseMatrixType_t = c_int;
pub const CUSPARSE_MATRIX_TYPE_GENERAL: cusparseMatrixType_t = 0;
pub const CUSPARSE_MATRIX_TYPE_SYMMETRIC: cusparseMatrixType_t = 1;
pub const CUSPARSE_MATRIX_TYPE_HERMITIAN: cusparseMatrixType_t = 2;
pub const CUSPARSE_MATRIX_TYPE_TRIANGULAR: cusparseMatrixType_t = 3;

pub type cusparseIndexBase_t = c_int;
pub const CUSPARSE_INDEX_BASE_ZERO: cusparseIndexBase_t = 0;
pub const CUSPARSE_INDEX_BASE_ONE: cusparseIndexBase_t = 1;

extern "C" {
    pub fn cusparseCreateMatDescr(descrA: *mut cusparseMatDescr_t) -> cusparseStatus_t;
    pub fn cusparseDestroyMatDescr(descrA: cusparseMatDescr_t) -> cusparseStatus_t;
    pub fn cusparseSetMatType(descrA: cusparseMatDescr_t, type_: cusparseMatrixType_t) -> cusparseStatus_t;
    pub fn cusparseSetMatIndexBase(descrA: cusparseMatDescr_t, base: cusparseIndexBase_t) -> cusparseStatus_t;
}
