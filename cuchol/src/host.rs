//! Host round trip: upload a `sprs` matrix, solve on the device, download.

use cuchol_core::{reverse_cuthill_mckee, HostCsr, Ordering, SolveReport, SolverConfig};
use cuda_runtime::DeviceBuffer;
use cusolver::SpCholScalar;
use sprs::CsMat;

use crate::device::{DeviceCsr, DeviceVector, DeviceVectorMut};
use crate::error::Result;
use crate::solver::CholeskySolver;

/// Solution of a host round trip, in the caller's original row order.
#[derive(Debug, Clone)]
pub struct HostSolution<T> {
    pub x: Vec<T>,
    pub report: SolveReport,
    /// Host ordering that was applied, if any.
    pub ordering: Option<Ordering>,
}

impl<T: Copy> HostSolution<T> {
    fn empty(a: &HostCsr<T>, config: &SolverConfig) -> Self {
        Self {
            x: Vec::new(),
            report: SolveReport::new(0, a.nnz(), config.reorder),
            ordering: None,
        }
    }
}

impl CholeskySolver {
    /// Solve a host-resident system; see [`solve_host`].
    pub fn solve_host<T>(&self, a: &HostCsr<T>, b: &[T]) -> Result<HostSolution<T>>
    where
        T: SpCholScalar + Default,
    {
        a.check_rhs(b)?;
        let n = a.n();
        if n == 0 {
            return Ok(HostSolution::empty(a, self.config()));
        }
        if !a.is_structurally_symmetric() {
            log::warn!("A is not structurally symmetric, {n}x{n} with nnz={}", a.nnz());
        }

        let ordering = if self.config().host_ordering && n > 1 {
            Some(reverse_cuthill_mckee(a))
        } else {
            None
        };
        let permuted = match &ordering {
            Some(ord) => Some(a.permute_symmetric(ord)?),
            None => None,
        };
        let csr = permuted.as_ref().unwrap_or(a);
        let rhs = match &ordering {
            Some(ord) => ord.gather(b)?,
            None => b.to_vec(),
        };
        if let Some(p) = &permuted {
            log::debug!("host RCM bandwidth {} -> {}", a.bandwidth(), p.bandwidth());
        }

        let d_row_ptr = DeviceBuffer::from_host(csr.row_ptr())?;
        let d_col_ind = DeviceBuffer::from_host(csr.col_ind())?;
        let d_values = DeviceBuffer::from_host(csr.values())?;
        let d_b = DeviceBuffer::from_host(&rhs)?;
        let mut d_x = DeviceBuffer::<T>::zeroed(n)?;

        let mut report = {
            let a_view = DeviceCsr::from_buffers(n, &d_row_ptr, &d_col_ind, &d_values)?;
            let b_view = DeviceVector::from_buffer(&d_b);
            let mut x_view = DeviceVectorMut::from_buffer(&mut d_x);
            self.solve(&a_view, &b_view, &mut x_view)?
        };
        report.host_ordered = ordering.is_some();

        let x_perm = d_x.to_vec()?;
        let x = match &ordering {
            Some(ord) => ord.scatter_back(&x_perm)?,
            None => x_perm,
        };
        Ok(HostSolution {
            x,
            report,
            ordering,
        })
    }
}

/// Solve `A x = b` for a host `sprs` matrix on the GPU.
///
/// With `config.host_ordering` set, `A` is reordered by reverse Cuthill-McKee
/// before upload and `x` is permuted back before it is returned.
pub fn solve_host<T>(a: &CsMat<T>, b: &[T], config: &SolverConfig) -> Result<HostSolution<T>>
where
    T: SpCholScalar + Default,
{
    let csr = HostCsr::from_sprs(a)?;
    csr.check_rhs(b)?;
    config.validate()?;
    if csr.n() == 0 {
        return Ok(HostSolution::empty(&csr, config));
    }
    let solver = CholeskySolver::new(config.clone())?;
    solver.solve_host(&csr, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::gpu_available;
    use approx::assert_relative_eq;
    use cuchol_core::{residual_norm, CholError};
    use sprs::TriMat;

    use crate::error::SolveError;

    /// 5-point Laplacian on a `k x k` grid, plus `shift` on the diagonal.
    fn laplacian_2d(k: usize, shift: f64) -> CsMat<f64> {
        let n = k * k;
        let mut tri = TriMat::new((n, n));
        for r in 0..k {
            for c in 0..k {
                let i = r * k + c;
                tri.add_triplet(i, i, 4.0 + shift);
                if c + 1 < k {
                    tri.add_triplet(i, i + 1, -1.0);
                    tri.add_triplet(i + 1, i, -1.0);
                }
                if r + 1 < k {
                    tri.add_triplet(i, i + k, -1.0);
                    tri.add_triplet(i + k, i, -1.0);
                }
            }
        }
        tri.to_csr()
    }

    #[test]
    fn test_rectangular_rejected_before_device() {
        let mut tri = TriMat::new((3, 2));
        tri.add_triplet(0, 0, 1.0);
        let a: CsMat<f64> = tri.to_csr();
        let err = solve_host(&a, &[1.0, 1.0, 1.0], &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::Input(CholError::NotSquare { .. })));
    }

    #[test]
    fn test_rhs_mismatch_rejected_before_device() {
        let a = laplacian_2d(2, 0.0);
        let err = solve_host(&a, &[1.0; 3], &SolverConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SolveError::Input(CholError::DimensionMismatch { expected: 4, found: 3, .. })
        ));
    }

    #[test]
    fn test_host_round_trip_with_and_without_ordering() {
        if !gpu_available() {
            return;
        }
        let a = laplacian_2d(8, 0.0);
        let b: Vec<f64> = (0..64).map(|i| 1.0 + (i % 7) as f64).collect();

        let ordered = solve_host(&a, &b, &SolverConfig::default()).unwrap();
        assert!(ordered.report.host_ordered);
        assert!(ordered.ordering.is_some());
        assert!(residual_norm(&a, &ordered.x, &b).unwrap() < 1e-9);

        let plain = solve_host(&a, &b, &SolverConfig::default().with_host_ordering(false)).unwrap();
        assert!(!plain.report.host_ordered);
        for (p, q) in plain.x.iter().zip(&ordered.x) {
            assert_relative_eq!(*p, *q, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_host_round_trip_f32() {
        if !gpu_available() {
            return;
        }
        let a64 = laplacian_2d(4, 1.0);
        let a: CsMat<f32> = a64.map(|&v| v as f32);
        let b = vec![1.0f32; 16];
        let sol = solve_host(&a, &b, &SolverConfig::default().with_tolerance(1e-6)).unwrap();
        assert!(!sol.report.is_singular());
        assert!(residual_norm(&a, &sol.x, &b).unwrap() < 1e-4);
    }

    #[test]
    fn test_empty_system_skips_device() {
        let a: CsMat<f64> = TriMat::new((0, 0)).to_csr();
        let sol = solve_host(&a, &[], &SolverConfig::default()).unwrap();
        assert!(sol.x.is_empty());
        assert_eq!(sol.report.n, 0);
        assert!(!sol.report.host_ordered);
        assert!(sol.ordering.is_none());

        let bad = SolverConfig::default().with_tolerance(f64::INFINITY);
        assert!(solve_host(&a, &[], &bad).unwrap_err().is_input_error());
    }

    #[test]
    fn test_unsymmetric_pattern_still_solves() {
        if !gpu_available() {
            return;
        }
        // Lower-triangular storage of [[2, 1], [1, 2]].
        let mut tri = TriMat::new((2, 2));
        tri.add_triplet(0, 0, 2.0);
        tri.add_triplet(1, 0, 1.0);
        tri.add_triplet(1, 1, 2.0);
        let a: CsMat<f64> = tri.to_csr();
        let sol = solve_host(&a, &[3.0, 3.0], &SolverConfig::default().with_host_ordering(false)).unwrap();
        assert!(!sol.report.is_singular());
    }
}
