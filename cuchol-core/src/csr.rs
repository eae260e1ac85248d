//! Host-resident square CSR matrices with 32-bit indices.
//!
//! cusolverSp takes `int` row pointers and column indices, so everything here
//! is stored as `i32` and checked against that range on construction.

use sprs::CsMat;

use crate::error::{to_index, CholError, Result};
use crate::ordering::Ordering;

/// Square CSR matrix ready to upload for a Cholesky solve.
#[derive(Debug, Clone, PartialEq)]
pub struct HostCsr<T> {
    n: usize,
    row_ptr: Vec<i32>,
    col_ind: Vec<i32>,
    values: Vec<T>,
}

impl<T: Copy> HostCsr<T> {
    /// Build from raw CSR arrays, validating the structure.
    pub fn from_raw_parts(
        n: usize,
        row_ptr: Vec<i32>,
        col_ind: Vec<i32>,
        values: Vec<T>,
    ) -> Result<Self> {
        validate_structure(n, &row_ptr, &col_ind, values.len())?;
        Ok(Self {
            n,
            row_ptr,
            col_ind,
            values,
        })
    }

    /// Convert a `sprs` matrix. CSC input is transposed into CSR storage first.
    pub fn from_sprs(a: &CsMat<T>) -> Result<Self>
    where
        T: Default,
    {
        let (rows, cols) = a.shape();
        if rows != cols {
            return Err(CholError::NotSquare { rows, cols });
        }
        to_index("n", rows)?;
        to_index("nnz", a.nnz())?;

        let owned;
        let csr = if a.is_csr() {
            a
        } else {
            owned = a.to_csr();
            &owned
        };

        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_ind = Vec::with_capacity(csr.nnz());
        let mut values = Vec::with_capacity(csr.nnz());
        row_ptr.push(0);
        for row in csr.outer_iterator() {
            for (col, &val) in row.iter() {
                col_ind.push(col as i32);
                values.push(val);
            }
            row_ptr.push(col_ind.len() as i32);
        }
        Self::from_raw_parts(rows, row_ptr, col_ind, values)
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.col_ind.len()
    }

    pub fn row_ptr(&self) -> &[i32] {
        &self.row_ptr
    }

    pub fn col_ind(&self) -> &[i32] {
        &self.col_ind
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Iterate `(col, value)` over one row.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let start = self.row_ptr[i] as usize;
        let end = self.row_ptr[i + 1] as usize;
        self.col_ind[start..end]
            .iter()
            .zip(&self.values[start..end])
            .map(|(&c, &v)| (c as usize, v))
    }

    /// Largest `|i - j|` over the stored entries.
    pub fn bandwidth(&self) -> usize {
        (0..self.n)
            .flat_map(|i| self.row(i).map(move |(j, _)| i.abs_diff(j)))
            .max()
            .unwrap_or(0)
    }

    /// True when every stored `(i, j)` has a stored `(j, i)`.
    pub fn is_structurally_symmetric(&self) -> bool {
        (0..self.n).all(|i| {
            self.row(i).all(|(j, _)| {
                let start = self.row_ptr[j] as usize;
                let end = self.row_ptr[j + 1] as usize;
                self.col_ind[start..end].binary_search(&(i as i32)).is_ok()
            })
        })
    }

    /// Symmetric permutation `A'[i][j] = A[perm[i]][perm[j]]`.
    pub fn permute_symmetric(&self, ordering: &Ordering) -> Result<Self> {
        if ordering.len() != self.n {
            return Err(CholError::DimensionMismatch {
                what: "ordering",
                expected: self.n,
                found: ordering.len(),
            });
        }
        let inverse = ordering.inverse();
        let mut row_ptr = Vec::with_capacity(self.n + 1);
        let mut col_ind = Vec::with_capacity(self.nnz());
        let mut values = Vec::with_capacity(self.nnz());
        let mut scratch: Vec<(i32, T)> = Vec::new();
        row_ptr.push(0);
        for &old_row in ordering.perm() {
            scratch.clear();
            scratch.extend(self.row(old_row).map(|(j, v)| (inverse[j] as i32, v)));
            scratch.sort_unstable_by_key(|&(j, _)| j);
            for &(j, v) in &scratch {
                col_ind.push(j);
                values.push(v);
            }
            row_ptr.push(col_ind.len() as i32);
        }
        Ok(Self {
            n: self.n,
            row_ptr,
            col_ind,
            values,
        })
    }

    /// Check that a right-hand side matches the matrix dimension.
    pub fn check_rhs(&self, b: &[T]) -> Result<()> {
        if b.len() != self.n {
            return Err(CholError::DimensionMismatch {
                what: "right-hand side",
                expected: self.n,
                found: b.len(),
            });
        }
        Ok(())
    }
}

impl HostCsr<()> {
    /// Sparsity pattern from CSR index arrays whose rows may be unsorted or
    /// hold duplicates, as scipy and CuPy allow. Each row is sorted and
    /// deduplicated before the usual validation.
    pub fn from_unsorted_pattern(row_ptr: &[i32], col_ind: &[i32]) -> Result<Self> {
        let n = row_ptr.len().checked_sub(1).ok_or_else(|| {
            CholError::InvalidStructure("row_ptr must have at least one entry".to_string())
        })?;
        let nnz = col_ind.len() as i64;
        let mut sorted_ptr = Vec::with_capacity(n + 1);
        let mut sorted_cols = Vec::with_capacity(col_ind.len());
        sorted_ptr.push(0);
        for (i, w) in row_ptr.windows(2).enumerate() {
            let (start, end) = (w[0] as i64, w[1] as i64);
            if start < 0 || start > end || end > nnz {
                return Err(CholError::InvalidStructure(format!(
                    "row {i} spans {start}..{end} outside 0..{nnz}"
                )));
            }
            let mut row = col_ind[start as usize..end as usize].to_vec();
            row.sort_unstable();
            row.dedup();
            sorted_cols.extend(row);
            sorted_ptr.push(to_index("nnz", sorted_cols.len())?);
        }
        let values = vec![(); sorted_cols.len()];
        Self::from_raw_parts(n, sorted_ptr, sorted_cols, values)
    }
}

impl<T: Copy + Into<f64>> HostCsr<T> {
    /// `y = A x` accumulated in `f64`.
    pub fn mul_vec(&self, x: &[T]) -> Result<Vec<f64>> {
        self.check_rhs(x)?;
        Ok((0..self.n)
            .map(|i| self.row(i).map(|(j, v)| as_f64(v) * as_f64(x[j])).sum::<f64>())
            .collect())
    }

    /// `‖A x − b‖₂`.
    pub fn residual_norm(&self, x: &[T], b: &[T]) -> Result<f64> {
        self.check_rhs(b)?;
        let ax = self.mul_vec(x)?;
        Ok(ax
            .iter()
            .zip(b)
            .map(|(&axi, &bi)| {
                let r = axi - as_f64(bi);
                r * r
            })
            .sum::<f64>()
            .sqrt())
    }
}

#[inline]
fn as_f64<T: Into<f64>>(v: T) -> f64 {
    v.into()
}

/// `‖A x − b‖₂` for a `sprs` matrix.
pub fn residual_norm<T>(a: &CsMat<T>, x: &[T], b: &[T]) -> Result<f64>
where
    T: Copy + Default + Into<f64>,
{
    HostCsr::from_sprs(a)?.residual_norm(x, b)
}

/// Checks that a `rows x cols` matrix and a right-hand side of `rhs_len`
/// entries form a square system, and returns its dimension.
pub fn check_system_shape((rows, cols): (usize, usize), rhs_len: usize) -> Result<usize> {
    if rows != cols {
        return Err(CholError::NotSquare { rows, cols });
    }
    if rhs_len != rows {
        return Err(CholError::DimensionMismatch {
            what: "right-hand side",
            expected: rows,
            found: rhs_len,
        });
    }
    to_index("n", rows)?;
    Ok(rows)
}

/// Checks the CSR invariants cusolverSp relies on.
pub fn validate_structure(n: usize, row_ptr: &[i32], col_ind: &[i32], nvalues: usize) -> Result<()> {
    to_index("n", n)?;
    to_index("nnz", col_ind.len())?;
    if row_ptr.len() != n + 1 {
        return Err(CholError::DimensionMismatch {
            what: "row_ptr",
            expected: n + 1,
            found: row_ptr.len(),
        });
    }
    if nvalues != col_ind.len() {
        return Err(CholError::DimensionMismatch {
            what: "values",
            expected: col_ind.len(),
            found: nvalues,
        });
    }
    if row_ptr[0] != 0 {
        return Err(CholError::InvalidStructure(format!(
            "row_ptr[0] = {}, expected 0",
            row_ptr[0]
        )));
    }
    if row_ptr[n] as usize != col_ind.len() || row_ptr[n] < 0 {
        return Err(CholError::InvalidStructure(format!(
            "row_ptr[{n}] = {} but there are {} column indices",
            row_ptr[n],
            col_ind.len()
        )));
    }
    for (i, w) in row_ptr.windows(2).enumerate() {
        if w[1] < w[0] {
            return Err(CholError::InvalidStructure(format!(
                "row_ptr decreases at row {i} ({} > {})",
                w[0], w[1]
            )));
        }
        if w[1] > row_ptr[n] {
            return Err(CholError::InvalidStructure(format!(
                "row_ptr[{}] = {} exceeds nnz = {}",
                i + 1,
                w[1],
                row_ptr[n]
            )));
        }
        let cols = &col_ind[w[0] as usize..w[1] as usize];
        for (k, &c) in cols.iter().enumerate() {
            if c < 0 || c as usize >= n {
                return Err(CholError::InvalidStructure(format!(
                    "column index {c} in row {i} is outside 0..{n}"
                )));
            }
            if k > 0 && cols[k - 1] >= c {
                return Err(CholError::InvalidStructure(format!(
                    "column indices in row {i} are not strictly increasing"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sprs::TriMat;

    /// Tridiagonal [-1, 2, -1] of size n.
    fn laplacian_1d(n: usize) -> CsMat<f64> {
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            tri.add_triplet(i, i, 2.0);
            if i + 1 < n {
                tri.add_triplet(i, i + 1, -1.0);
                tri.add_triplet(i + 1, i, -1.0);
            }
        }
        tri.to_csr()
    }

    #[test]
    fn test_from_sprs_csr_and_csc_agree() {
        let csr = laplacian_1d(5);
        let csc = csr.to_csc();
        let a = HostCsr::from_sprs(&csr).unwrap();
        let b = HostCsr::from_sprs(&csc).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n(), 5);
        assert_eq!(a.nnz(), 13);
        assert_eq!(a.row_ptr(), &[0, 2, 5, 8, 11, 13]);
        assert_eq!(&a.col_ind()[..5], &[0, 1, 0, 1, 2]);
        assert!(a.is_structurally_symmetric());
        assert_eq!(a.bandwidth(), 1);
    }

    #[test]
    fn test_check_system_shape() {
        assert_eq!(check_system_shape((4, 4), 4).unwrap(), 4);
        assert_eq!(check_system_shape((0, 0), 0).unwrap(), 0);
        assert!(matches!(
            check_system_shape((3, 4), 3),
            Err(CholError::NotSquare { rows: 3, cols: 4 })
        ));
        assert!(matches!(
            check_system_shape((3, 3), 2),
            Err(CholError::DimensionMismatch { what: "right-hand side", expected: 3, found: 2 })
        ));
        assert!(matches!(
            check_system_shape((1 << 31, 1 << 31), 1 << 31),
            Err(CholError::IndexOverflow { what: "n", .. })
        ));
    }

    #[test]
    fn test_from_sprs_rejects_rectangular() {
        let mut tri = TriMat::new((2, 3));
        tri.add_triplet(0, 0, 1.0);
        let a: CsMat<f64> = tri.to_csr();
        assert!(matches!(
            HostCsr::from_sprs(&a),
            Err(CholError::NotSquare { rows: 2, cols: 3 })
        ));
    }

    #[test]
    fn test_validate_structure_errors() {
        assert!(validate_structure(2, &[0, 1, 2], &[0, 1], 2).is_ok());
        assert!(matches!(
            validate_structure(2, &[0, 1], &[0, 1], 2),
            Err(CholError::DimensionMismatch { what: "row_ptr", .. })
        ));
        assert!(matches!(
            validate_structure(2, &[0, 1, 2], &[0, 1], 3),
            Err(CholError::DimensionMismatch { what: "values", .. })
        ));
        assert!(matches!(
            validate_structure(2, &[1, 1, 2], &[0, 1], 2),
            Err(CholError::InvalidStructure(_))
        ));
        assert!(matches!(
            validate_structure(2, &[0, 2, 1], &[0, 1], 2),
            Err(CholError::InvalidStructure(_))
        ));
        assert!(matches!(
            validate_structure(2, &[0, 1, 2], &[0, 2], 2),
            Err(CholError::InvalidStructure(_))
        ));
        assert!(matches!(
            validate_structure(2, &[0, 2, 2], &[1, 0], 2),
            Err(CholError::InvalidStructure(_))
        ));
        assert!(matches!(
            validate_structure(2, &[0, 1, 3], &[0, 1], 2),
            Err(CholError::InvalidStructure(_))
        ));
        assert!(matches!(
            validate_structure(2, &[0, 5, 2], &[0, 1], 2),
            Err(CholError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_empty_matrix() {
        let a = HostCsr::<f64>::from_raw_parts(0, vec![0], vec![], vec![]).unwrap();
        assert_eq!(a.nnz(), 0);
        assert_eq!(a.bandwidth(), 0);
        assert_eq!(a.residual_norm(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_residual_norm() {
        let a = laplacian_1d(3);
        // A * [1, 1, 1] = [1, 0, 1]
        let x = [1.0, 1.0, 1.0];
        assert_relative_eq!(residual_norm(&a, &x, &[1.0, 0.0, 1.0]).unwrap(), 0.0);
        assert_relative_eq!(
            residual_norm(&a, &x, &[0.0, 0.0, 0.0]).unwrap(),
            2.0f64.sqrt()
        );
        assert!(matches!(
            residual_norm(&a, &x, &[1.0]),
            Err(CholError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_permute_symmetric() {
        // [[4, 1, 0], [1, 5, 2], [0, 2, 6]]
        let a = HostCsr::from_raw_parts(
            3,
            vec![0, 2, 5, 7],
            vec![0, 1, 0, 1, 2, 1, 2],
            vec![4.0, 1.0, 1.0, 5.0, 2.0, 2.0, 6.0],
        )
        .unwrap();
        let ordering = Ordering::from_perm(vec![2, 0, 1]).unwrap();
        let p = a.permute_symmetric(&ordering).unwrap();
        // P[i][j] = A[perm[i]][perm[j]]
        // row 0 <- old row 2: (2,1)=2 -> col 2, (2,2)=6 -> col 0
        assert_eq!(p.row(0).collect::<Vec<_>>(), vec![(0, 6.0), (2, 2.0)]);
        assert_eq!(p.row(1).collect::<Vec<_>>(), vec![(1, 4.0), (2, 1.0)]);
        assert_eq!(p.row(2).collect::<Vec<_>>(), vec![(0, 2.0), (1, 1.0), (2, 5.0)]);
        assert!(validate_structure(3, p.row_ptr(), p.col_ind(), p.values().len()).is_ok());

        let wrong = Ordering::identity(2);
        assert!(a.permute_symmetric(&wrong).is_err());
    }

    #[test]
    fn test_unsorted_pattern() {
        // Row 0 is unsorted with a duplicate; row 1 is empty.
        let p = HostCsr::from_unsorted_pattern(&[0, 4, 4, 5], &[2, 0, 2, 1, 2]).unwrap();
        assert_eq!(p.n(), 3);
        assert_eq!(p.row_ptr(), &[0, 3, 3, 4]);
        assert_eq!(p.col_ind(), &[0, 1, 2, 2]);

        assert!(HostCsr::from_unsorted_pattern(&[], &[]).is_err());
        assert!(HostCsr::from_unsorted_pattern(&[0, 3], &[0]).is_err());
        assert!(HostCsr::from_unsorted_pattern(&[0, 1], &[4]).is_err());
    }

    #[test]
    fn test_structural_symmetry() {
        let a = HostCsr::from_raw_parts(2, vec![0, 2, 3], vec![0, 1, 1], vec![1.0, 2.0, 3.0]).unwrap();
        assert!(!a.is_structurally_symmetric());
    }
}
