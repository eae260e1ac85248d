//! The cusolverSp Cholesky call-site.

use std::sync::Arc;

use cuchol_core::{to_index, DeviceReorder, SingularPolicy, SolveReport, SolverConfig};
use cuda_runtime::Stream;
use cusolver::{Reorder, SpCholScalar, SpHandle};
use cusparse::{IndexBase, MatDescr, MatrixType};

use crate::device::{check_device_accessible, check_shapes, DeviceCsr, DeviceVector, DeviceVectorMut};
use crate::error::{Result, SolveError};

fn to_cusolver_reorder(reorder: DeviceReorder) -> Reorder {
    match reorder {
        DeviceReorder::None => Reorder::None,
        DeviceReorder::Symrcm => Reorder::Symrcm,
        DeviceReorder::Symamd => Reorder::Symamd,
        DeviceReorder::Metis => Reorder::Metis,
    }
}

/// A cusolverSp context plus the matrix descriptor it solves against.
///
/// Creating one is the expensive part of a solve; keep it around when the
/// same process solves many systems.
pub struct CholeskySolver {
    // Field order is drop order: descriptor, solver context, then the stream
    // the context was bound to.
    descr: MatDescr,
    handle: SpHandle,
    config: SolverConfig,
    stream: Option<Arc<Stream>>,
}

impl CholeskySolver {
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let handle = SpHandle::new()?;
        let descr = MatDescr::with(MatrixType::General, IndexBase::Zero)?;
        log::info!(
            "cusolverSp context created (tol={:e}, reorder={})",
            config.tolerance,
            config.reorder
        );
        Ok(Self {
            descr,
            handle,
            config,
            stream: None,
        })
    }

    /// Issue work on `stream` instead of the legacy default stream.
    ///
    /// The solver keeps a reference to the stream, so it stays alive for as
    /// long as the context can enqueue work on it.
    pub fn with_stream(mut self, stream: Arc<Stream>) -> Result<Self> {
        self.handle.set_stream(&stream)?;
        self.stream = Some(stream);
        Ok(self)
    }

    pub fn stream(&self) -> Option<&Arc<Stream>> {
        self.stream.as_ref()
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Solve `A x = b`, writing `x` in place.
    ///
    /// `A` must be symmetric positive definite; the routine only reports where
    /// factorization broke down, see [`SingularPolicy`].
    pub fn solve<T: SpCholScalar>(
        &self,
        a: &DeviceCsr<'_, T>,
        b: &DeviceVector<'_, T>,
        x: &mut DeviceVectorMut<'_, T>,
    ) -> Result<SolveReport> {
        check_shapes(a, b, x)?;
        let report = SolveReport::new(a.n(), a.nnz(), self.config.reorder);
        if a.n() == 0 {
            return Ok(report);
        }
        if self.config.check_pointers {
            a.check_device_accessible()?;
            check_device_accessible(b.as_ptr(), "b")?;
            check_device_accessible(x.as_mut_ptr() as *const T, "x")?;
        }

        let m = to_index("n", a.n())?;
        let nnz = to_index("nnz", a.nnz())?;
        log::debug!(
            "{}csrlsvchol: n={m}, nnz={nnz}, tol={:e}, reorder={}",
            T::PREFIX,
            self.config.tolerance,
            self.config.reorder
        );

        let raw = unsafe {
            self.handle.csrlsvchol::<T>(
                m,
                nnz,
                &self.descr,
                a.values(),
                a.row_ptr(),
                a.col_ind(),
                b.as_ptr(),
                self.config.tolerance,
                to_cusolver_reorder(self.config.reorder),
                x.as_mut_ptr(),
            )?
        };

        let report = report.with_raw_singularity(raw);
        if let Some(row) = report.singularity {
            log::warn!("A is singular at row {row}");
            if self.config.on_singular == SingularPolicy::Error {
                return Err(SolveError::Singular { row });
            }
        }
        Ok(report)
    }
}

/// One-shot solve: acquire a context, describe `A`, factor and solve, release.
///
/// An empty system returns an empty report without touching the device.
pub fn solve_device_csr<T: SpCholScalar>(
    a: &DeviceCsr<'_, T>,
    b: &DeviceVector<'_, T>,
    x: &mut DeviceVectorMut<'_, T>,
    config: &SolverConfig,
) -> Result<SolveReport> {
    config.validate()?;
    check_shapes(a, b, x)?;
    if a.n() == 0 {
        return Ok(SolveReport::new(0, a.nnz(), config.reorder));
    }
    let solver = CholeskySolver::new(config.clone())?;
    solver.solve(a, b, x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::gpu_available;
    use approx::assert_relative_eq;
    use cuda_runtime::{DeviceBuffer, MemoryType};

    struct Upload {
        row_ptr: DeviceBuffer<i32>,
        col_ind: DeviceBuffer<i32>,
        values: DeviceBuffer<f64>,
        b: DeviceBuffer<f64>,
        x: DeviceBuffer<f64>,
    }

    fn upload(n: usize, row_ptr: &[i32], col_ind: &[i32], values: &[f64], b: &[f64]) -> Upload {
        Upload {
            row_ptr: DeviceBuffer::from_host(row_ptr).unwrap(),
            col_ind: DeviceBuffer::from_host(col_ind).unwrap(),
            values: DeviceBuffer::from_host(values).unwrap(),
            b: DeviceBuffer::from_host(b).unwrap(),
            x: DeviceBuffer::zeroed(n).unwrap(),
        }
    }

    fn run(n: usize, up: &mut Upload, config: SolverConfig) -> Result<SolveReport> {
        let a = DeviceCsr::from_buffers(n, &up.row_ptr, &up.col_ind, &up.values)?;
        let b = DeviceVector::from_buffer(&up.b);
        let mut x = DeviceVectorMut::from_buffer(&mut up.x);
        solve_device_csr(&a, &b, &mut x, &config)
    }

    #[test]
    fn test_reorder_mapping() {
        assert_eq!(to_cusolver_reorder(DeviceReorder::None), Reorder::None);
        assert_eq!(to_cusolver_reorder(DeviceReorder::Symrcm), Reorder::Symrcm);
        assert_eq!(to_cusolver_reorder(DeviceReorder::Symamd), Reorder::Symamd);
        assert_eq!(to_cusolver_reorder(DeviceReorder::Metis), Reorder::Metis);
    }

    #[test]
    fn test_solve_spd_tridiagonal() {
        if !gpu_available() {
            return;
        }
        // [[4, 1, 0], [1, 4, 1], [0, 1, 4]] x = [5, 6, 5] has x = [1, 1, 1].
        let mut up = upload(
            3,
            &[0, 2, 5, 7],
            &[0, 1, 0, 1, 2, 1, 2],
            &[4.0, 1.0, 1.0, 4.0, 1.0, 1.0, 4.0],
            &[5.0, 6.0, 5.0],
        );
        for reorder in [DeviceReorder::None, DeviceReorder::Symrcm, DeviceReorder::Symamd] {
            let config = SolverConfig::default().with_reorder(reorder);
            let report = run(3, &mut up, config).unwrap();
            assert!(!report.is_singular());
            assert_eq!(report.nnz, 7);
            for xi in up.x.to_vec().unwrap() {
                assert_relative_eq!(xi, 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_policy() {
        if !gpu_available() {
            return;
        }
        // Second pivot is exactly zero.
        let mut up = upload(2, &[0, 1, 2], &[0, 1], &[1.0, 0.0], &[1.0, 1.0]);

        let report = run(2, &mut up, SolverConfig::default()).unwrap();
        assert_eq!(report.singularity, Some(1));

        let strict = SolverConfig::default().with_singular_policy(SingularPolicy::Error);
        let err = run(2, &mut up, strict).unwrap_err();
        assert!(matches!(err, SolveError::Singular { row: 1 }));
    }

    #[test]
    fn test_solve_on_stream() {
        if !gpu_available() {
            return;
        }
        let stream = Arc::new(Stream::new().unwrap());
        let solver = CholeskySolver::new(SolverConfig::default())
            .unwrap()
            .with_stream(Arc::clone(&stream))
            .unwrap();
        // The solver's own reference keeps the stream alive.
        drop(stream);
        let stream = Arc::clone(solver.stream().unwrap());
        let mut up = upload(2, &[0, 1, 2], &[0, 1], &[2.0, 4.0], &[2.0, 2.0]);
        {
            let a = DeviceCsr::from_buffers(2, &up.row_ptr, &up.col_ind, &up.values).unwrap();
            let b = DeviceVector::from_buffer(&up.b);
            let mut x = DeviceVectorMut::from_buffer(&mut up.x);
            solver.solve(&a, &b, &mut x).unwrap();
        }
        stream.synchronize().unwrap();
        let x = up.x.to_vec().unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_host_pointer_rejected() {
        if !gpu_available() {
            return;
        }
        let mut up = upload(2, &[0, 1, 2], &[0, 1], &[2.0, 4.0], &[2.0, 2.0]);
        let host_b = vec![2.0f64, 2.0];
        let a = DeviceCsr::from_buffers(2, &up.row_ptr, &up.col_ind, &up.values).unwrap();
        let b = unsafe { DeviceVector::from_raw_parts(host_b.as_ptr(), 2) }.unwrap();
        let mut x = DeviceVectorMut::from_buffer(&mut up.x);

        let config = SolverConfig::default().with_check_pointers(true);
        let err = solve_device_csr(&a, &b, &mut x, &config).unwrap_err();
        assert!(matches!(
            err,
            SolveError::NotDeviceMemory {
                what: "b",
                found: MemoryType::Unregistered | MemoryType::Host
            }
        ));
    }

    #[test]
    fn test_empty_system_skips_device() {
        let a = unsafe {
            DeviceCsr::<f64>::from_raw_parts(0, 0, std::ptr::null(), std::ptr::null(), std::ptr::null())
        }
        .unwrap();
        let b = unsafe { DeviceVector::<f64>::from_raw_parts(std::ptr::null(), 0) }.unwrap();
        let mut x = unsafe { DeviceVectorMut::<f64>::from_raw_parts(std::ptr::null_mut(), 0) }.unwrap();

        let config = SolverConfig::default().with_reorder(DeviceReorder::Symamd);
        let report = solve_device_csr(&a, &b, &mut x, &config).unwrap();
        assert_eq!(report.n, 0);
        assert_eq!(report.reorder, DeviceReorder::Symamd);
        assert!(!report.is_singular());

        let bad = SolverConfig::default().with_tolerance(-1.0);
        assert!(solve_device_csr(&a, &b, &mut x, &bad).unwrap_err().is_input_error());
    }

    #[test]
    fn test_shape_mismatch_before_device_call() {
        if !gpu_available() {
            return;
        }
        let mut up = upload(2, &[0, 1, 2], &[0, 1], &[1.0, 1.0], &[1.0, 1.0, 1.0]);
        let err = run(2, &mut up, SolverConfig::default()).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SolverConfig::default().with_tolerance(f64::NAN);
        assert!(matches!(
            CholeskySolver::new(config),
            Err(SolveError::Input(_))
        ));
    }
}
