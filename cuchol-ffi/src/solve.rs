//! One-shot solves over caller-owned device arrays.

use cuchol::{
    solve_device_csr, CholeskySolver, DeviceCsr, DeviceReorder, DeviceVector, DeviceVectorMut,
    SolveError, SolveReport, SolverConfig, SpCholScalar,
};
use libc::c_int;

use crate::error::{clear_last_error, fail, invalid, with_panic_boundary};
use crate::CucholResult;

fn dimension(context: &str, what: &str, value: c_int) -> Result<usize, CucholResult> {
    usize::try_from(value)
        .map_err(|_| invalid(context, &format!("{what} must be non-negative, got {value}")))
}

/// Device views over the raw arguments of a solve call.
pub(crate) struct RawSystem<'a, T> {
    a: DeviceCsr<'a, T>,
    b: DeviceVector<'a, T>,
    x: DeviceVectorMut<'a, T>,
}

/// Checks dimensions and pointers without touching the device.
#[allow(clippy::too_many_arguments)]
pub(crate) unsafe fn wrap_raw<'a, T>(
    context: &str,
    row_ptr: *const c_int,
    col_ind: *const c_int,
    values: *const T,
    b: *const T,
    x: *mut T,
    n: c_int,
    nnz: c_int,
) -> Result<RawSystem<'a, T>, CucholResult> {
    let n = dimension(context, "n", n)?;
    let nnz = dimension(context, "nnz", nnz)?;
    let a = DeviceCsr::from_raw_parts(n, nnz, row_ptr, col_ind, values).map_err(|e| fail(context, &e))?;
    let b = DeviceVector::from_raw_parts(b, n).map_err(|e| fail(context, &e))?;
    let x = DeviceVectorMut::from_raw_parts(x, n).map_err(|e| fail(context, &e))?;
    Ok(RawSystem { a, b, x })
}

/// Runs `solver` over a wrapped system and reports back through the C ABI.
pub(crate) unsafe fn solve_raw<T: SpCholScalar>(
    context: &str,
    solver: &CholeskySolver,
    mut system: RawSystem<'_, T>,
    singularity_out: *mut c_int,
) -> CucholResult {
    let result = solver.solve(&system.a, &system.b, &mut system.x);
    finish(context, result, singularity_out)
}

/// Translates a solve result for the C caller.
///
/// `singularity_out`, when non-null, receives the first row at which the
/// factorization broke down; it is left untouched otherwise.
unsafe fn finish(context: &str, result: cuchol::Result<SolveReport>, singularity_out: *mut c_int) -> CucholResult {
    let singular_row = match &result {
        Ok(report) => report.singularity,
        Err(SolveError::Singular { row }) => Some(*row),
        Err(_) => None,
    };
    if let Some(row) = singular_row {
        if !singularity_out.is_null() {
            *singularity_out = c_int::try_from(row).unwrap_or(c_int::MAX);
        }
    }

    match result {
        Ok(_) => {
            clear_last_error();
            CucholResult::Success
        }
        Err(e) => fail(context, &e),
    }
}

fn one_shot_config(context: &str, tolerance: f64, reorder: c_int) -> Result<SolverConfig, CucholResult> {
    let reorder = DeviceReorder::from_code(reorder).map_err(|e| invalid(context, &e.to_string()))?;
    let config = SolverConfig::default()
        .with_tolerance(tolerance)
        .with_reorder(reorder);
    config.validate().map_err(|e| invalid(context, &e.to_string()))?;
    Ok(config)
}

#[allow(clippy::too_many_arguments)]
unsafe fn solve_one_shot<T: SpCholScalar>(
    context: &str,
    row_ptr: *const c_int,
    col_ind: *const c_int,
    values: *const T,
    b: *const T,
    x: *mut T,
    n: c_int,
    nnz: c_int,
    config: Result<SolverConfig, CucholResult>,
    singularity_out: *mut c_int,
) -> CucholResult {
    if !singularity_out.is_null() {
        *singularity_out = -1;
    }
    let mut system = match wrap_raw(context, row_ptr, col_ind, values, b, x, n, nnz) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let config = match config {
        Ok(c) => c,
        Err(code) => return code,
    };
    let result = solve_device_csr(&system.a, &system.b, &mut system.x, &config);
    finish(context, result, singularity_out)
}

/// Solve `A x = b` in double precision, all arrays in device memory.
///
/// `reorder` is the cuSOLVER code: 0 none, 1 symrcm, 2 symamd, 3 metis.
/// A singular matrix is not an error here: the row is written to
/// `singularity_out` (which may be null) and a warning is logged.
#[no_mangle]
pub unsafe extern "C" fn cuchol_solve_csr_f64(
    row_ptr: *const c_int,
    col_ind: *const c_int,
    values: *const f64,
    b: *const f64,
    x: *mut f64,
    n: c_int,
    nnz: c_int,
    tolerance: f64,
    reorder: c_int,
    singularity_out: *mut c_int,
) -> CucholResult {
    const CONTEXT: &str = "cuchol_solve_csr_f64";
    with_panic_boundary(CONTEXT, || {
        let config = one_shot_config(CONTEXT, tolerance, reorder);
        solve_one_shot(
            CONTEXT,
            row_ptr,
            col_ind,
            values,
            b,
            x,
            n,
            nnz,
            config,
            singularity_out,
        )
    })
}

/// Single-precision variant of [`cuchol_solve_csr_f64`].
#[no_mangle]
pub unsafe extern "C" fn cuchol_solve_csr_f32(
    row_ptr: *const c_int,
    col_ind: *const c_int,
    values: *const f32,
    b: *const f32,
    x: *mut f32,
    n: c_int,
    nnz: c_int,
    tolerance: f64,
    reorder: c_int,
    singularity_out: *mut c_int,
) -> CucholResult {
    const CONTEXT: &str = "cuchol_solve_csr_f32";
    with_panic_boundary(CONTEXT, || {
        let config = one_shot_config(CONTEXT, tolerance, reorder);
        solve_one_shot(
            CONTEXT,
            row_ptr,
            col_ind,
            values,
            b,
            x,
            n,
            nnz,
            config,
            singularity_out,
        )
    })
}

/// Double-precision solve with tolerance 1e-14 and no device reordering.
#[no_mangle]
pub unsafe extern "C" fn cuchol_solve_csr(
    row_ptr: *const c_int,
    col_ind: *const c_int,
    values: *const f64,
    b: *const f64,
    x: *mut f64,
    n: c_int,
    nnz: c_int,
    singularity_out: *mut c_int,
) -> CucholResult {
    const CONTEXT: &str = "cuchol_solve_csr";
    with_panic_boundary(CONTEXT, || {
        solve_one_shot(
            CONTEXT,
            row_ptr,
            col_ind,
            values,
            b,
            x,
            n,
            nnz,
            Ok(SolverConfig::default()),
            singularity_out,
        )
    })
}
