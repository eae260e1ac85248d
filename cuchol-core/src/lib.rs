//! Host-side building blocks for the cuchol GPU sparse Cholesky solver.
//!
//! Nothing in this crate touches the device: it validates CSR input, computes
//! fill-reducing orderings, parses solver configuration and checks residuals.
//! The `cuchol` crate performs the actual cuSOLVER call.

pub mod config;
pub mod csr;
pub mod error;
pub mod ordering;
pub mod report;

pub use config::{DeviceReorder, SingularPolicy, SolverConfig, DEFAULT_TOLERANCE};
pub use csr::{check_system_shape, residual_norm, validate_structure, HostCsr};
pub use error::{to_index, CholError, Result};
pub use ordering::{reverse_cuthill_mckee, Ordering};
pub use report::{singular_row, SolveReport};
