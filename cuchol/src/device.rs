//! Borrowed views over CSR arrays and vectors that already live on the device.
//!
//! These hold raw device pointers plus lengths and nothing else. They never
//! free memory; whoever produced the pointers (a `DeviceBuffer`, or an array
//! library on the other side of an FFI boundary) keeps ownership.

use std::marker::PhantomData;

use cuchol_core::{to_index, CholError};
use cuda_runtime::{pointer_memory_type, DeviceBuffer};

use crate::error::{Result, SolveError};

fn non_null<T>(ptr: *const T, len: usize, what: &'static str) -> Result<()> {
    if len > 0 && ptr.is_null() {
        return Err(CholError::NullPointer { what }.into());
    }
    Ok(())
}

fn expect_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(CholError::DimensionMismatch {
            what,
            expected,
            found,
        }
        .into());
    }
    Ok(())
}

/// Asks the runtime whether `ptr` can be read by device code.
pub(crate) fn check_device_accessible<T>(ptr: *const T, what: &'static str) -> Result<()> {
    let found = pointer_memory_type(ptr)?;
    if found.is_device_accessible() {
        Ok(())
    } else {
        Err(SolveError::NotDeviceMemory { what, found })
    }
}

/// Square CSR matrix in device memory (zero-based, `i32` indices).
#[derive(Debug, Clone, Copy)]
pub struct DeviceCsr<'a, T> {
    n: usize,
    nnz: usize,
    row_ptr: *const i32,
    col_ind: *const i32,
    values: *const T,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> DeviceCsr<'a, T> {
    /// Wrap caller-owned device arrays.
    ///
    /// # Safety
    /// `row_ptr` must address `n + 1` device `i32`s, `col_ind` and `values`
    /// `nnz` elements each, all valid for `'a`.
    pub unsafe fn from_raw_parts(
        n: usize,
        nnz: usize,
        row_ptr: *const i32,
        col_ind: *const i32,
        values: *const T,
    ) -> Result<Self> {
        to_index("n", n)?;
        to_index("nnz", nnz)?;
        non_null(row_ptr, n, "row_ptr")?;
        non_null(col_ind, nnz, "col_ind")?;
        non_null(values, nnz, "values")?;
        Ok(Self {
            n,
            nnz,
            row_ptr,
            col_ind,
            values,
            _marker: PhantomData,
        })
    }

    /// View over buffers allocated by this crate.
    pub fn from_buffers(
        n: usize,
        row_ptr: &'a DeviceBuffer<i32>,
        col_ind: &'a DeviceBuffer<i32>,
        values: &'a DeviceBuffer<T>,
    ) -> Result<Self> {
        to_index("n", n)?;
        expect_len("row_ptr", n + 1, row_ptr.len())?;
        expect_len("values", col_ind.len(), values.len())?;
        unsafe {
            Self::from_raw_parts(
                n,
                col_ind.len(),
                row_ptr.as_ptr(),
                col_ind.as_ptr(),
                values.as_ptr(),
            )
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.nnz
    }

    pub fn row_ptr(&self) -> *const i32 {
        self.row_ptr
    }

    pub fn col_ind(&self) -> *const i32 {
        self.col_ind
    }

    pub fn values(&self) -> *const T {
        self.values
    }

    pub(crate) fn check_device_accessible(&self) -> Result<()> {
        check_device_accessible(self.row_ptr, "row_ptr")?;
        if self.nnz > 0 {
            check_device_accessible(self.col_ind, "col_ind")?;
            check_device_accessible(self.values, "values")?;
        }
        Ok(())
    }
}

/// Read-only dense vector in device memory.
#[derive(Debug, Clone, Copy)]
pub struct DeviceVector<'a, T> {
    ptr: *const T,
    len: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> DeviceVector<'a, T> {
    /// # Safety
    /// `ptr` must address `len` device elements valid for `'a`.
    pub unsafe fn from_raw_parts(ptr: *const T, len: usize) -> Result<Self> {
        non_null(ptr, len, "b")?;
        Ok(Self {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    pub fn from_buffer(buf: &'a DeviceBuffer<T>) -> Self {
        Self {
            ptr: buf.as_ptr(),
            len: buf.len(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }
}

/// Writable dense vector in device memory; the solution is written here.
#[derive(Debug)]
pub struct DeviceVectorMut<'a, T> {
    ptr: *mut T,
    len: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> DeviceVectorMut<'a, T> {
    /// # Safety
    /// `ptr` must address `len` writable device elements valid for `'a`, not
    /// aliased by any other view for that lifetime.
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> Result<Self> {
        non_null(ptr, len, "x")?;
        Ok(Self {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    pub fn from_buffer(buf: &'a mut DeviceBuffer<T>) -> Self {
        Self {
            len: buf.len(),
            ptr: buf.as_mut_ptr(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }
}

/// Checks that `b` and `x` both match the matrix dimension.
pub fn check_shapes<T>(a: &DeviceCsr<'_, T>, b: &DeviceVector<'_, T>, x: &DeviceVectorMut<'_, T>) -> Result<()> {
    expect_len("b", a.n(), b.len())?;
    expect_len("x", a.n(), x.len())?;
    Ok(())
}
