//! Safe Rust wrapper for the cuSPARSE matrix descriptor.

use cusparse_sys::*;
use std::ptr;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cuSPARSE Error: {0} ({})", status_name(*.0))]
pub struct CusparseError(pub i32);

pub type Result<T> = std::result::Result<T, CusparseError>;

#[inline]
fn check(code: cusparseStatus_t) -> Result<()> {
    if code == CUSPARSE_STATUS_SUCCESS {
        Ok(())
    } else {
        Err(CusparseError(code))
    }
}

/// Symbolic name of a cuSPARSE status code.
pub fn status_name(code: i32) -> &'static str {
    match code {
        CUSPARSE_STATUS_SUCCESS => "CUSPARSE_STATUS_SUCCESS",
        CUSPARSE_STATUS_NOT_INITIALIZED => "CUSPARSE_STATUS_NOT_INITIALIZED",
        CUSPARSE_STATUS_ALLOC_FAILED => "CUSPARSE_STATUS_ALLOC_FAILED",
        CUSPARSE_STATUS_INVALID_VALUE => "CUSPARSE_STATUS_INVALID_VALUE",
        CUSPARSE_STATUS_ARCH_MISMATCH => "CUSPARSE_STATUS_ARCH_MISMATCH",
        CUSPARSE_STATUS_EXECUTION_FAILED => "CUSPARSE_STATUS_EXECUTION_FAILED",
        CUSPARSE_STATUS_INTERNAL_ERROR => "CUSPARSE_STATUS_INTERNAL_ERROR",
        CUSPARSE_STATUS_MATRIX_TYPE_NOT_SUPPORTED => "CUSPARSE_STATUS_MATRIX_TYPE_NOT_SUPPORTED",
        CUSPARSE_STATUS_NOT_SUPPORTED => "CUSPARSE_STATUS_NOT_SUPPORTED",
        CUSPARSE_STATUS_INSUFFICIENT_RESOURCES => "CUSPARSE_STATUS_INSUFFICIENT_RESOURCES",
        _ => "CUSPARSE_STATUS_UNKNOWN",
    }
}

/// Storage interpretation of a matrix described by [`MatDescr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixType {
    General,
    Symmetric,
    Hermitian,
    Triangular,
}

impl MatrixType {
    pub fn to_cusparse(self) -> i32 {
        match self {
            MatrixType::General => CUSPARSE_MATRIX_TYPE_GENERAL,
            MatrixType::Symmetric => CUSPARSE_MATRIX_TYPE_SYMMETRIC,
            MatrixType::Hermitian => CUSPARSE_MATRIX_TYPE_HERMITIAN,
            MatrixType::Triangular => CUSPARSE_MATRIX_TYPE_TRIANGULAR,
        }
    }
}

/// Base of the stored row pointers and column indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBase {
    Zero,
    One,
}

impl IndexBase {
    pub fn to_cusparse(self) -> i32 {
        match self {
            IndexBase::Zero => CUSPARSE_INDEX_BASE_ZERO,
            IndexBase::One => CUSPARSE_INDEX_BASE_ONE,
        }
    }
}

/// Legacy matrix descriptor (`cusparseMatDescr_t`), as taken by cusolverSp.
pub struct MatDescr {
    handle: cusparseMatDescr_t,
}

impl MatDescr {
    /// Create a descriptor. cuSPARSE defaults it to general, zero-based.
    pub fn new() -> Result<Self> {
        let mut handle = ptr::null_mut();
        unsafe { check(cusparseCreateMatDescr(&mut handle))? };
        Ok(Self { handle })
    }

    /// Create a descriptor with an explicit type and index base.
    pub fn with(matrix_type: MatrixType, base: IndexBase) -> Result<Self> {
        let descr = Self::new()?;
        descr.set_matrix_type(matrix_type)?;
        descr.set_index_base(base)?;
        Ok(descr)
    }

    pub fn set_matrix_type(&self, matrix_type: MatrixType) -> Result<()> {
        unsafe { check(cusparseSetMatType(self.handle, matrix_type.to_cusparse())) }
    }

    pub fn set_index_base(&self, base: IndexBase) -> Result<()> {
        unsafe { check(cusparseSetMatIndexBase(self.handle, base.to_cusparse())) }
    }

    /// Get the raw descriptor.
    pub fn as_raw(&self) -> cusparseMatDescr_t {
        self.handle
    }
}

impl Drop for MatDescr {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { cusparseDestroyMatDescr(self.handle) };
        }
    }
}

unsafe impl Send for MatDescr {}
unsafe impl Sync for MatDescr {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_descr() {
        let _ = MatDescr::with(MatrixType::General, IndexBase::Zero);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(status_name(CUSPARSE_STATUS_INVALID_VALUE), "CUSPARSE_STATUS_INVALID_VALUE");
        assert_eq!(status_name(-7), "CUSPARSE_STATUS_UNKNOWN");
        let msg = CusparseError(CUSPARSE_STATUS_ALLOC_FAILED).to_string();
        assert!(msg.contains("ALLOC_FAILED"), "{msg}");
    }

    #[test]
    fn test_enum_codes() {
        assert_eq!(MatrixType::General.to_cusparse(), 0);
        assert_eq!(IndexBase::Zero.to_cusparse(), 0);
        assert_eq!(IndexBase::One.to_cusparse(), 1);
    }
}
