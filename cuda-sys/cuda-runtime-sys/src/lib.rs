//! Raw FFI bindings to the subset of the CUDA Runtime API used by cuchol.
//!
//! This crate provides unsafe, low-level bindings to the CUDA Runtime API.
//! For a safer interface, use the `cuda-runtime` crate.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(non_upper_case_globals)]
#![allow(clippy::all)]

use libc::{c_char, c_int, c_uint, c_void, size_t};

// ============================================================================
// Error Types
// ============================================================================

pub type cudaError_t = c_int;

pub const cudaSuccess: cudaError_t = 0;
pub const cudaErrorInvalidValue: cudaError_t = 1;
pub const cudaErrorMemoryAllocation: cudaError_t = 2;
pub const cudaErrorInitializationError: cudaError_t = 3;
pub const cudaErrorInvalidDevicePointer: cudaError_t = 17;
pub const cudaErrorInsufficientDriver: cudaError_t = 35;
pub const cudaErrorNoDevice: cudaError_t = 100;
pub const cudaErrorIllegalAddress: cudaError_t = 700;
pub const cudaErrorUnknown: cudaError_t = 999;

// ============================================================================
// Memory Copy Direction
// ============================================================================

pub type cudaMemcpyKind = c_int;

pub const cudaMemcpyHostToDevice: cudaMemcpyKind = 1;
pub const cudaMemcpyDeviceToHost: cudaMemcpyKind = 2;

// ============================================================================
// Pointer Attributes
// ============================================================================

pub type cudaMemoryType = c_int;

pub const cudaMemoryTypeUnregistered: cudaMemoryType = 0;
pub const cudaMemoryTypeHost: cudaMemoryType = 1;
pub const cudaMemoryTypeDevice: cudaMemoryType = 2;
pub const cudaMemoryTypeManaged: cudaMemoryType = 3;

/// Layout as of CUDA 11 (the `memoryType` field was removed).
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct cudaPointerAttributes {
    pub type_: cudaMemoryType,
    pub device: c_int,
    pub devicePointer: *mut c_void,
    pub hostPointer: *mut c_void,
}

impl Default for cudaPointerAttributes {
    fn default() -> Self {
        Self {
            type_: cudaMemoryTypeUnregistered,
            device: -1,
            devicePointer: std::ptr::null_mut(),
            hostPointer: std::ptr::null_mut(),
        }
    }
}

// ============================================================================
// Opaque Types
// ============================================================================

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct CUstream_st {
    _unused: [u8; 0],
}
pub type cudaStream_t = *mut CUstream_st;

pub const cudaStreamNonBlocking: c_uint = 0x01;

// ============================================================================
// Functions
// ============================================================================

extern "C" {
    pub fn cudaGetDeviceCount(count: *mut c_int) -> cudaError_t;

    // Memory management
    pub fn cudaMalloc(devPtr: *mut *mut c_void, size: size_t) -> cudaError_t;
    pub fn cudaFree(devPtr: *mut c_void) -> cudaError_t;
    pub fn cudaMemset(devPtr: *mut c_void, value: c_int, count: size_t) -> cudaError_t;
    pub fn cudaMemcpy(
        dst: *mut c_void,
        src: *const c_void,
        count: size_t,
        kind: cudaMemcpyKind,
    ) -> cudaError_t;
    pub fn cudaPointerGetAttributes(
        attributes: *mut cudaPointerAttributes,
        ptr: *const c_void,
    ) -> cudaError_t;

    // Stream management
    pub fn cudaStreamCreateWithFlags(pStream: *mut cudaStream_t, flags: c_uint) -> cudaError_t;
    pub fn cudaStreamDestroy(stream: cudaStream_t) -> cudaError_t;
    pub fn cudaStreamSynchronize(stream: cudaStream_t) -> cudaError_t;

    // Error handling
    pub fn cudaGetErrorString(error: cudaError_t) -> *const c_char;
}
