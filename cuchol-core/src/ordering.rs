//! Bandwidth-reducing symmetric orderings computed on the host.
//!
//! Reordering before upload keeps the Cholesky fill-in down when the same
//! sparsity pattern is solved repeatedly: compute the ordering once, permute
//! each new matrix and right-hand side, and skip the device-side reordering.

use std::collections::VecDeque;

use crate::csr::HostCsr;
use crate::error::{CholError, Result};

/// A permutation together with its inverse.
///
/// `perm[i]` is the original index that lands at position `i`, and
/// `inverse[perm[i]] == i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    perm: Vec<usize>,
    inverse: Vec<usize>,
}

impl Ordering {
    pub fn identity(n: usize) -> Self {
        Self {
            perm: (0..n).collect(),
            inverse: (0..n).collect(),
        }
    }

    /// Wrap a permutation vector, rejecting duplicates and out-of-range entries.
    pub fn from_perm(perm: Vec<usize>) -> Result<Self> {
        let n = perm.len();
        let mut inverse = vec![usize::MAX; n];
        for (i, &p) in perm.iter().enumerate() {
            if p >= n {
                return Err(CholError::InvalidPermutation(format!(
                    "entry {p} at position {i} is outside 0..{n}"
                )));
            }
            if inverse[p] != usize::MAX {
                return Err(CholError::InvalidPermutation(format!(
                    "index {p} appears more than once"
                )));
            }
            inverse[p] = i;
        }
        Ok(Self { perm, inverse })
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn inverse(&self) -> &[usize] {
        &self.inverse
    }

    pub fn is_identity(&self) -> bool {
        self.perm.iter().enumerate().all(|(i, &p)| i == p)
    }

    /// `out[i] = v[perm[i]]`, the right-hand side in permuted order.
    pub fn gather<T: Copy>(&self, v: &[T]) -> Result<Vec<T>> {
        self.check_len(v.len())?;
        Ok(self.perm.iter().map(|&p| v[p]).collect())
    }

    /// `out[k] = v[inverse[k]]`, a permuted solution back in original order.
    pub fn scatter_back<T: Copy>(&self, v: &[T]) -> Result<Vec<T>> {
        self.check_len(v.len())?;
        Ok(self.inverse.iter().map(|&q| v[q]).collect())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.len() {
            return Err(CholError::DimensionMismatch {
                what: "permuted vector",
                expected: self.len(),
                found: len,
            });
        }
        Ok(())
    }
}

/// Symmetrized adjacency (pattern of `A + Aᵀ`, diagonal dropped).
fn symmetric_adjacency<T: Copy>(a: &HostCsr<T>) -> Vec<Vec<usize>> {
    let n = a.n();
    let mut adj = vec![Vec::new(); n];
    for i in 0..n {
        for (j, _) in a.row(i) {
            if i != j {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }
    for list in &mut adj {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// Reverse Cuthill-McKee ordering of the symmetrized pattern of `a`.
///
/// Components are started from their lowest-degree unvisited vertex (ties
/// broken by index) and neighbours are queued by ascending degree, so the
/// result is deterministic for a given pattern.
pub fn reverse_cuthill_mckee<T: Copy>(a: &HostCsr<T>) -> Ordering {
    let n = a.n();
    let adj = symmetric_adjacency(a);
    let degree: Vec<usize> = adj.iter().map(Vec::len).collect();

    let mut by_degree: Vec<usize> = (0..n).collect();
    by_degree.sort_by_key(|&v| (degree[v], v));

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    let mut components = 0usize;
    let mut neighbours = Vec::new();

    for &start in &by_degree {
        if visited[start] {
            continue;
        }
        components += 1;
        visited[start] = true;
        queue.push_back(start);
        while let Some(v) = queue.pop_front() {
            order.push(v);
            neighbours.clear();
            neighbours.extend(adj[v].iter().copied().filter(|&u| !visited[u]));
            neighbours.sort_by_key(|&u| (degree[u], u));
            for &u in &neighbours {
                visited[u] = true;
                queue.push_back(u);
            }
        }
    }
    order.reverse();

    let inverse = {
        let mut inv = vec![0; n];
        for (i, &p) in order.iter().enumerate() {
            inv[p] = i;
        }
        inv
    };
    log::debug!("reverse Cuthill-McKee: n={n}, components={components}");
    Ordering {
        perm: order,
        inverse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(n: usize, edges: &[(usize, usize)]) -> HostCsr<f64> {
        let mut rows = vec![vec![]; n];
        for i in 0..n {
            rows[i].push(i);
        }
        for &(i, j) in edges {
            rows[i].push(j);
            rows[j].push(i);
        }
        let mut row_ptr = vec![0i32];
        let mut col_ind = vec![];
        for mut r in rows {
            r.sort_unstable();
            r.dedup();
            col_ind.extend(r.iter().map(|&c| c as i32));
            row_ptr.push(col_ind.len() as i32);
        }
        let values = vec![1.0; col_ind.len()];
        HostCsr::from_raw_parts(n, row_ptr, col_ind, values).unwrap()
    }

    fn assert_is_permutation(ord: &Ordering) {
        let mut seen = ord.perm().to_vec();
        seen.sort_unstable();
        assert_eq!(seen, (0..ord.len()).collect::<Vec<_>>());
        for (i, &p) in ord.perm().iter().enumerate() {
            assert_eq!(ord.inverse()[p], i);
        }
    }

    #[test]
    fn test_from_perm_validation() {
        let ord = Ordering::from_perm(vec![2, 0, 1]).unwrap();
        assert_eq!(ord.inverse(), &[1, 2, 0]);
        assert!(!ord.is_identity());
        assert!(Ordering::identity(4).is_identity());
        assert!(matches!(
            Ordering::from_perm(vec![0, 0, 1]),
            Err(CholError::InvalidPermutation(_))
        ));
        assert!(matches!(
            Ordering::from_perm(vec![0, 3, 1]),
            Err(CholError::InvalidPermutation(_))
        ));
    }

    #[test]
    fn test_gather_scatter_inverse() {
        let ord = Ordering::from_perm(vec![3, 1, 0, 2]).unwrap();
        let b = [10.0, 11.0, 12.0, 13.0];
        let pb = ord.gather(&b).unwrap();
        assert_eq!(pb, vec![13.0, 11.0, 10.0, 12.0]);
        assert_eq!(ord.scatter_back(&pb).unwrap(), b.to_vec());
        assert!(ord.gather(&b[..2]).is_err());
    }

    #[test]
    fn test_rcm_path_graph_is_banded() {
        // A path 0-5-2-4-1-3 scrambled across the indices.
        let a = pattern(6, &[(0, 5), (5, 2), (2, 4), (4, 1), (1, 3)]);
        assert!(a.bandwidth() > 1);
        let ord = reverse_cuthill_mckee(&a);
        assert_is_permutation(&ord);
        let p = a.permute_symmetric(&ord).unwrap();
        assert_eq!(p.bandwidth(), 1);
        assert_eq!(p.nnz(), a.nnz());
    }

    #[test]
    fn test_rcm_is_deterministic_and_reversed() {
        // Star centred at 0: leaves have degree 1, the centre degree 3.
        let a = pattern(4, &[(0, 1), (0, 2), (0, 3)]);
        let ord = reverse_cuthill_mckee(&a);
        // CM from leaf 1: [1, 0, 2, 3]; reversed.
        assert_eq!(ord.perm(), &[3, 2, 0, 1]);
        assert_eq!(ord, reverse_cuthill_mckee(&a));
    }

    #[test]
    fn test_rcm_disconnected_components() {
        let a = pattern(5, &[(0, 3), (1, 4)]);
        let ord = reverse_cuthill_mckee(&a);
        assert_is_permutation(&ord);
        assert_eq!(ord.len(), 5);
        assert!(a.permute_symmetric(&ord).unwrap().bandwidth() <= 1);
    }

    #[test]
    fn test_rcm_uses_symmetrized_pattern() {
        // Only the upper entry (0, 2) is stored.
        let a = HostCsr::from_raw_parts(3, vec![0, 2, 3, 4], vec![0, 2, 1, 2], vec![1.0; 4]).unwrap();
        let ord = reverse_cuthill_mckee(&a);
        assert_is_permutation(&ord);
        let pos0 = ord.inverse()[0];
        let pos2 = ord.inverse()[2];
        assert_eq!(pos0.abs_diff(pos2), 1);
    }

    #[test]
    fn test_rcm_empty() {
        let a = HostCsr::<f64>::from_raw_parts(0, vec![0], vec![], vec![]).unwrap();
        assert!(reverse_cuthill_mckee(&a).is_empty());
    }
}
