use cuchol_core::CholError;
use cuda_runtime::{CudaError, MemoryType};
use cusolver::CusolverError;
use cusparse::CusparseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error(transparent)]
    Input(#[from] CholError),

    #[error(transparent)]
    Cuda(#[from] CudaError),

    #[error(transparent)]
    Cusparse(#[from] CusparseError),

    #[error(transparent)]
    Cusolver(#[from] CusolverError),

    #[error("{what} is not device-accessible memory ({found:?})")]
    NotDeviceMemory {
        what: &'static str,
        found: MemoryType,
    },

    #[error("matrix is singular at row {row}")]
    Singular { row: usize },
}

pub type Result<T> = std::result::Result<T, SolveError>;

impl SolveError {
    /// True for errors caused by the caller's input rather than the device.
    pub fn is_input_error(&self) -> bool {
        matches!(self, SolveError::Input(_) | SolveError::NotDeviceMemory { .. })
    }
}
