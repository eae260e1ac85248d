//! Solve a 2-D Poisson problem on the GPU and report the residual.
//!
//! Usage: `cargo run --example poisson2d -- [grid_size]` (default 200).
//! Set `RUST_LOG=debug` to see the solver's diagnostics.

use std::time::Instant;

use cuchol::{residual_norm, reverse_cuthill_mckee, solve_host, HostCsr, SolverConfig};
use sprs::{CsMat, TriMat};

fn laplacian_2d(k: usize) -> CsMat<f64> {
    let n = k * k;
    let mut tri = TriMat::with_capacity((n, n), 5 * n);
    for r in 0..k {
        for c in 0..k {
            let i = r * k + c;
            tri.add_triplet(i, i, 4.0);
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

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let k: usize = std::env::args()
        .nth(1)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(200);
    let a = laplacian_2d(k);
    let b = vec![1.0f64; a.rows()];
    println!("n = {}, nnz = {}", a.rows(), a.nnz());

    // Reordering happens inside the call.
    let start = Instant::now();
    let sol = solve_host(&a, &b, &SolverConfig::default())?;
    println!(
        "host RCM + solve: {:.3}s, residual {:.3e}, singular: {:?}",
        start.elapsed().as_secs_f64(),
        residual_norm(&a, &sol.x, &b)?,
        sol.report.singularity
    );

    // Pre-ordering once on the CPU, for repeated solves on one pattern.
    let csr = HostCsr::from_sprs(&a)?;
    let ordering = reverse_cuthill_mckee(&csr);
    let permuted = csr.permute_symmetric(&ordering)?;
    println!("bandwidth {} -> {}", csr.bandwidth(), permuted.bandwidth());
    let pb = ordering.gather(&b)?;

    let config = SolverConfig::default().with_host_ordering(false);
    let solver = cuchol::CholeskySolver::new(config)?;
    let start = Instant::now();
    let pre = solver.solve_host(&permuted, &pb)?;
    println!(
        "pre-ordered solve: {:.3}s, residual {:.3e}",
        start.elapsed().as_secs_f64(),
        permuted.residual_norm(&pre.x, &pb)?
    );

    Ok(())
}
