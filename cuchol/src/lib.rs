//! GPU sparse Cholesky solves through cuSOLVER.
//!
//! The core entry point is [`solve_device_csr`]: it takes a square CSR matrix
//! and a right-hand side that already live in device memory and writes the
//! solution into a caller-provided device vector. Device pointers coming from
//! another array library are wrapped with the `from_raw_parts` constructors
//! on [`DeviceCsr`], [`DeviceVector`] and [`DeviceVectorMut`].
//!
//! [`solve_host`] is the convenience path for host data: it uploads a `sprs`
//! matrix, optionally applies a reverse Cuthill-McKee ordering first, solves,
//! and returns `x` in the original ordering.
//!
//! ```no_run
//! use cuchol::{solve_host, SolverConfig};
//! use sprs::TriMat;
//!
//! let mut tri = TriMat::new((2, 2));
//! tri.add_triplet(0, 0, 4.0);
//! tri.add_triplet(0, 1, 1.0);
//! tri.add_triplet(1, 0, 1.0);
//! tri.add_triplet(1, 1, 3.0);
//! let a = tri.to_csr();
//!
//! let sol = solve_host(&a, &[1.0, 2.0], &SolverConfig::default()).unwrap();
//! assert!(!sol.report.is_singular());
//! ```

mod device;
mod error;
mod host;
mod solver;

pub use cuchol_core::{
    check_system_shape, residual_norm, reverse_cuthill_mckee, CholError, DeviceReorder, HostCsr,
    Ordering, SingularPolicy, SolveReport, SolverConfig,
};
pub use cusolver::SpCholScalar;
pub use device::{check_shapes, DeviceCsr, DeviceVector, DeviceVectorMut};
pub use error::{Result, SolveError};
pub use host::{solve_host, HostSolution};
pub use solver::{solve_device_csr, CholeskySolver};
