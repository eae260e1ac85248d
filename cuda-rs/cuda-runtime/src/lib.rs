//! Safe Rust wrapper for the CUDA Runtime API.

use cuda_runtime_sys::*;
use std::ffi::CStr;
use std::ptr;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("CUDA Runtime Error: {0} ({1})")]
pub struct CudaError(pub i32, pub &'static str);

impl CudaError {
    pub fn from_code(code: cudaError_t) -> Self {
        let msg = unsafe {
            let ptr = cudaGetErrorString(code);
            if ptr.is_null() {
                "Unknown error"
            } else {
                CStr::from_ptr(ptr).to_str().unwrap_or("Unknown error")
            }
        };
        CudaError(code, msg)
    }
}

pub type Result<T> = std::result::Result<T, CudaError>;

#[inline]
fn check(code: cudaError_t) -> Result<()> {
    if code == cudaSuccess {
        Ok(())
    } else {
        Err(CudaError::from_code(code))
    }
}

/// Owned stream that does not synchronize with the legacy default stream,
/// so a solver bound to it can overlap with other work in the process.
pub struct Stream {
    handle: cudaStream_t,
}

impl Stream {
    pub fn new() -> Result<Self> {
        let mut handle = ptr::null_mut();
        unsafe { check(cudaStreamCreateWithFlags(&mut handle, cudaStreamNonBlocking))? };
        Ok(Self { handle })
    }

    /// Block until all work queued on the stream has finished.
    pub fn synchronize(&self) -> Result<()> {
        unsafe { check(cudaStreamSynchronize(self.handle)) }
    }

    /// Get the raw stream handle.
    pub fn as_raw(&self) -> cudaStream_t {
        self.handle
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { cudaStreamDestroy(self.handle) };
        }
    }
}

unsafe impl Send for Stream {}
unsafe impl Sync for Stream {}

/// Device memory buffer with automatic deallocation.
pub struct DeviceBuffer<T> {
    ptr: *mut T,
    len: usize,
}

impl<T> DeviceBuffer<T> {
    /// Allocate device memory for `len` elements.
    pub fn new(len: usize) -> Result<Self> {
        let size = len * std::mem::size_of::<T>();
        let mut ptr = ptr::null_mut();
        if size > 0 {
            unsafe { check(cudaMalloc(&mut ptr, size))? };
        }
        Ok(Self { ptr: ptr as *mut T, len })
    }

    /// Allocate `len` elements and clear them to zero bytes.
    pub fn zeroed(len: usize) -> Result<Self> {
        let mut buf = Self::new(len)?;
        buf.memset(0)?;
        Ok(buf)
    }

    /// Allocate a buffer sized to `data` and upload it.
    pub fn from_host(data: &[T]) -> Result<Self> {
        let mut buf = Self::new(data.len())?;
        buf.copy_from_host(data)?;
        Ok(buf)
    }

    /// Get the length of the buffer in elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the size of the buffer in bytes.
    pub fn size(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    /// Get the raw device pointer.
    pub fn as_ptr(&self) -> *const T {
        self.ptr
    }

    /// Get the raw mutable device pointer.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    fn check_fits(&self, len: usize) -> Result<()> {
        if len > self.len {
            return Err(CudaError(
                cudaErrorInvalidValue,
                "host slice is longer than the device buffer",
            ));
        }
        Ok(())
    }

    /// Upload `data` to the start of the buffer.
    pub fn copy_from_host(&mut self, data: &[T]) -> Result<()> {
        self.check_fits(data.len())?;
        let size = data.len() * std::mem::size_of::<T>();
        if size == 0 {
            return Ok(());
        }
        unsafe {
            check(cudaMemcpy(
                self.ptr as *mut _,
                data.as_ptr() as *const _,
                size,
                cudaMemcpyHostToDevice,
            ))
        }
    }

    /// Download the first `data.len()` elements.
    pub fn copy_to_host(&self, data: &mut [T]) -> Result<()> {
        self.check_fits(data.len())?;
        let size = data.len() * std::mem::size_of::<T>();
        if size == 0 {
            return Ok(());
        }
        unsafe {
            check(cudaMemcpy(
                data.as_mut_ptr() as *mut _,
                self.ptr as *const _,
                size,
                cudaMemcpyDeviceToHost,
            ))
        }
    }

    /// Fill every byte with `value`.
    pub fn memset(&mut self, value: i32) -> Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        unsafe { check(cudaMemset(self.ptr as *mut _, value, self.size())) }
    }
}

impl<T: Copy + Default> DeviceBuffer<T> {
    /// Download the whole buffer into a new vector.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut out = vec![T::default(); self.len];
        self.copy_to_host(&mut out)?;
        Ok(out)
    }
}

impl<T> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { cudaFree(self.ptr as *mut _) };
        }
    }
}

unsafe impl<T: Send> Send for DeviceBuffer<T> {}
unsafe impl<T: Sync> Sync for DeviceBuffer<T> {}

/// Where a pointer lives, as reported by `cudaPointerGetAttributes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    Unregistered,
    Host,
    Device,
    Managed,
}

impl MemoryType {
    fn from_raw(value: cudaMemoryType) -> Self {
        match value {
            cudaMemoryTypeHost => MemoryType::Host,
            cudaMemoryTypeDevice => MemoryType::Device,
            cudaMemoryTypeManaged => MemoryType::Managed,
            _ => MemoryType::Unregistered,
        }
    }

    /// Device kernels can dereference this memory.
    pub fn is_device_accessible(self) -> bool {
        matches!(self, MemoryType::Device | MemoryType::Managed)
    }
}

/// Query the memory type of an arbitrary pointer.
pub fn pointer_memory_type<T>(ptr: *const T) -> Result<MemoryType> {
    let mut attrs = cudaPointerAttributes::default();
    unsafe { check(cudaPointerGetAttributes(&mut attrs, ptr as *const _))? };
    Ok(MemoryType::from_raw(attrs.type_))
}

/// Number of visible devices. A machine without a driver or device reports
/// zero rather than an error.
pub fn device_count() -> Result<i32> {
    let mut count = 0;
    match unsafe { cudaGetDeviceCount(&mut count) } {
        cudaSuccess => Ok(count),
        cudaErrorNoDevice | cudaErrorInsufficientDriver => Ok(0),
        code => Err(CudaError::from_code(code)),
    }
}
