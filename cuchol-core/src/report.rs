use crate::config::DeviceReorder;

/// Outcome of one Cholesky solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveReport {
    pub n: usize,
    pub nnz: usize,
    /// First row at which the factorization hit a pivot below tolerance.
    pub singularity: Option<usize>,
    pub reorder: DeviceReorder,
    /// A host-side ordering was applied before the device call.
    pub host_ordered: bool,
}

impl SolveReport {
    pub fn new(n: usize, nnz: usize, reorder: DeviceReorder) -> Self {
        Self {
            n,
            nnz,
            singularity: None,
            reorder,
            host_ordered: false,
        }
    }

    /// Record the solver's raw `singularity` output (`-1` means none).
    pub fn with_raw_singularity(mut self, raw: i32) -> Self {
        self.singularity = singular_row(raw);
        self
    }

    pub fn is_singular(&self) -> bool {
        self.singularity.is_some()
    }
}

/// Decodes the `singularity` out-parameter of cusolverSp.
pub fn singular_row(raw: i32) -> Option<usize> {
    usize::try_from(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_row() {
        assert_eq!(singular_row(-1), None);
        assert_eq!(singular_row(0), Some(0));
        assert_eq!(singular_row(41), Some(41));
    }

    #[test]
    fn test_report() {
        let report = SolveReport::new(10, 28, DeviceReorder::Symrcm);
        assert!(!report.is_singular());
        assert!(!report.host_ordered);
        let report = report.with_raw_singularity(3);
        assert_eq!(report.singularity, Some(3));
        assert!(report.is_singular());
    }
}
