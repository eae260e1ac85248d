//! Python bindings for cuchol.
//!
//! Builds the `cupy_chol` extension module. The solve functions take CuPy
//! arrays and hand their device pointers straight to cuSOLVER; nothing is
//! copied to the host. `compute_ordering` works on host numpy arrays so an
//! ordering can be computed once and reused for a fixed sparsity pattern.
//! `cuchol_solve` is the high-level entry point over a CuPy CSR matrix.

use cuchol::{
    check_system_shape, reverse_cuthill_mckee, solve_device_csr, DeviceCsr, DeviceReorder, DeviceVector,
    DeviceVectorMut, HostCsr, SingularPolicy, SolveError, SolveReport, SolverConfig, SpCholScalar,
};
use numpy::{PyArray1, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyRuntimeWarning, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PySlice;

/// Device address and element count of a CuPy array.
#[derive(Debug, Clone, Copy)]
struct CupyArray {
    ptr: usize,
    size: usize,
}

/// Reads `a.data.ptr` and `a.size`, checking dtype and layout first.
fn cupy_array(obj: &Bound<'_, PyAny>, name: &str, dtype: &str) -> PyResult<CupyArray> {
    let found: String = obj.getattr("dtype")?.getattr("name")?.extract()?;
    if found != dtype {
        return Err(PyValueError::new_err(format!(
            "{name} must have dtype {dtype}, got {found}"
        )));
    }
    let contiguous: bool = obj.getattr("flags")?.getattr("c_contiguous")?.extract()?;
    if !contiguous {
        return Err(PyValueError::new_err(format!("{name} must be C-contiguous")));
    }
    Ok(CupyArray {
        ptr: obj.getattr("data")?.getattr("ptr")?.extract()?,
        size: obj.getattr("size")?.extract()?,
    })
}

fn value_dtype(obj: &Bound<'_, PyAny>) -> PyResult<String> {
    obj.getattr("dtype")?.getattr("name")?.extract()
}

/// The five arrays of one system, as plain addresses so they can cross
/// `allow_threads`.
#[derive(Debug, Clone, Copy)]
struct CupySystem {
    row_ptr: CupyArray,
    col_ind: CupyArray,
    values: CupyArray,
    b: CupyArray,
    x: CupyArray,
}

impl CupySystem {
    fn extract(
        indptr: &Bound<'_, PyAny>,
        indices: &Bound<'_, PyAny>,
        data: &Bound<'_, PyAny>,
        b: &Bound<'_, PyAny>,
        x: &Bound<'_, PyAny>,
        dtype: &str,
    ) -> PyResult<Self> {
        Ok(Self {
            row_ptr: cupy_array(indptr, "indptr", "int32")?,
            col_ind: cupy_array(indices, "indices", "int32")?,
            values: cupy_array(data, "data", dtype)?,
            b: cupy_array(b, "b", dtype)?,
            x: cupy_array(x, "x", dtype)?,
        })
    }

    fn n(&self) -> PyResult<usize> {
        self.row_ptr
            .size
            .checked_sub(1)
            .ok_or_else(|| PyValueError::new_err("indptr must have at least one entry"))
    }

    fn solve<T: SpCholScalar>(self, n: usize, config: SolverConfig) -> Result<SolveReport, SolveError> {
        let (a, b, mut x) = unsafe {
            (
                DeviceCsr::from_raw_parts(
                    n,
                    self.col_ind.size,
                    self.row_ptr.ptr as *const i32,
                    self.col_ind.ptr as *const i32,
                    self.values.ptr as *const T,
                )?,
                DeviceVector::from_raw_parts(self.b.ptr as *const T, self.b.size)?,
                DeviceVectorMut::from_raw_parts(self.x.ptr as *mut T, self.x.size)?,
            )
        };
        if self.values.size != a.nnz() {
            return Err(cuchol::CholError::DimensionMismatch {
                what: "data",
                expected: a.nnz(),
                found: self.values.size,
            }
            .into());
        }
        solve_device_csr(&a, &b, &mut x, &config)
    }
}

fn to_py_err(err: SolveError) -> PyErr {
    if err.is_input_error() {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(format!("Solver error: {err}"))
    }
}

fn run(py: Python<'_>, system: CupySystem, f64_values: bool, config: SolverConfig) -> PyResult<Option<usize>> {
    let n = system.n()?;
    let report = py
        .allow_threads(move || {
            if f64_values {
                system.solve::<f64>(n, config)
            } else {
                system.solve::<f32>(n, config)
            }
        })
        .map_err(to_py_err)?;

    if let Some(row) = report.singularity {
        let category = py.get_type_bound::<PyRuntimeWarning>();
        PyErr::warn_bound(py, &category, &format!("A is singular at row {row}"), 1)?;
    }
    Ok(report.singularity)
}

/// Solve `A x = b` in place with CuPy arrays.
///
/// `indptr`, `indices` and `data` are the CSR arrays of a symmetric positive
/// definite matrix (int32 indices, float64 values); `b` and `x` are float64
/// vectors. Uses tolerance 1e-14 and no device reordering.
///
/// Returns the row at which the factorization broke down, or `None`.
#[pyfunction]
fn solve_cupy_csr(
    py: Python<'_>,
    indptr: &Bound<'_, PyAny>,
    indices: &Bound<'_, PyAny>,
    data: &Bound<'_, PyAny>,
    b: &Bound<'_, PyAny>,
    x: &Bound<'_, PyAny>,
) -> PyResult<Option<usize>> {
    let system = CupySystem::extract(indptr, indices, data, b, x, "float64")?;
    run(py, system, true, SolverConfig::default())
}

/// Like `solve_cupy_csr`, with solver options and float32 support.
///
/// # Arguments
///
/// * `tol` - Pivot tolerance for singularity detection (default: 1e-14)
/// * `reorder` - Device reordering: "none", "symrcm", "symamd" or "metis"
/// * `raise_on_singular` - Raise RuntimeError instead of warning
#[pyfunction]
#[pyo3(signature = (indptr, indices, data, b, x, tol = 1e-14, reorder = "none", raise_on_singular = false))]
#[allow(clippy::too_many_arguments)]
fn solve_cupy_csr_ex(
    py: Python<'_>,
    indptr: &Bound<'_, PyAny>,
    indices: &Bound<'_, PyAny>,
    data: &Bound<'_, PyAny>,
    b: &Bound<'_, PyAny>,
    x: &Bound<'_, PyAny>,
    tol: f64,
    reorder: &str,
    raise_on_singular: bool,
) -> PyResult<Option<usize>> {
    let dtype = value_dtype(data)?;
    let f64_values = match dtype.as_str() {
        "float64" => true,
        "float32" => false,
        other => {
            return Err(PyValueError::new_err(format!(
                "data must be float32 or float64, got {other}"
            )))
        }
    };
    let reorder: DeviceReorder = reorder
        .parse()
        .map_err(|e: cuchol::CholError| PyValueError::new_err(e.to_string()))?;
    let policy = if raise_on_singular {
        SingularPolicy::Error
    } else {
        SingularPolicy::Warn
    };
    let config = SolverConfig::default()
        .with_tolerance(tol)
        .with_reorder(reorder)
        .with_singular_policy(policy);

    let system = CupySystem::extract(indptr, indices, data, b, x, &dtype)?;
    run(py, system, f64_values, config)
}

fn rcm_order(py: Python<'_>, indptr: &[i32], indices: &[i32]) -> PyResult<(Vec<i64>, Vec<i64>)> {
    let pattern = HostCsr::from_unsorted_pattern(indptr, indices)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let ordering = py.allow_threads(|| reverse_cuthill_mckee(&pattern));

    let order = ordering.perm().iter().map(|&p| p as i64).collect();
    let inverse = ordering.inverse().iter().map(|&q| q as i64).collect();
    Ok((order, inverse))
}

/// Reverse Cuthill-McKee ordering of a CSR pattern held in numpy arrays.
///
/// Returns `(order, inv_order)`: permute with `A[order][:, order]` and
/// `b[order]`, and recover the solution with `x[inv_order]`.
#[pyfunction]
fn compute_ordering<'py>(
    py: Python<'py>,
    indptr: PyReadonlyArray1<'py, i32>,
    indices: PyReadonlyArray1<'py, i32>,
) -> PyResult<(Bound<'py, PyArray1<i64>>, Bound<'py, PyArray1<i64>>)> {
    let (order, inverse) = rcm_order(py, indptr.as_slice()?, indices.as_slice()?)?;
    Ok((
        PyArray1::from_vec_bound(py, order),
        PyArray1::from_vec_bound(py, inverse),
    ))
}

/// Copies a CuPy index array to the host and computes its RCM ordering as
/// CuPy arrays, ready for fancy indexing on the device.
fn device_rcm<'py>(
    cupy: &Bound<'py, PyModule>,
    a: &Bound<'py, PyAny>,
) -> PyResult<(Bound<'py, PyAny>, Bound<'py, PyAny>)> {
    let py = cupy.py();
    let indptr = a.getattr("indptr")?.call_method0("get")?;
    let indices = a.getattr("indices")?.call_method0("get")?;
    let indptr: PyReadonlyArray1<'_, i32> = indptr.extract()?;
    let indices: PyReadonlyArray1<'_, i32> = indices.extract()?;
    let (order, inverse) = rcm_order(py, indptr.as_slice()?, indices.as_slice()?)?;
    Ok((
        cupy.call_method1("asarray", (PyArray1::from_vec_bound(py, order),))?,
        cupy.call_method1("asarray", (PyArray1::from_vec_bound(py, inverse),))?,
    ))
}

/// Solve `A x = b` for a CuPy CSR matrix and return `x` as a new CuPy array.
///
/// With `reorder` set, the pattern of `A` is copied to the host, a reverse
/// Cuthill-McKee ordering is computed there, and `A` and `b` are permuted on
/// the device before the solve; `x` is returned in the original row order.
/// Pass `reorder=False` when `A` was already permuted with
/// `compute_ordering`.
#[pyfunction]
#[pyo3(signature = (a, b, reorder = true))]
fn cuchol_solve<'py>(
    py: Python<'py>,
    a: &Bound<'py, PyAny>,
    b: &Bound<'py, PyAny>,
    reorder: bool,
) -> PyResult<Bound<'py, PyAny>> {
    let cupy = py.import_bound("cupy")?;
    let format: String = a.getattr("format")?.extract()?;
    if format != "csr" {
        return Err(PyValueError::new_err("Matrix A must be in CSR format"));
    }
    if !b.is_instance(&cupy.getattr("ndarray")?)? {
        return Err(PyValueError::new_err("Vector b must be a CuPy ndarray"));
    }
    let shape: (usize, usize) = a.getattr("shape")?.extract()?;
    let b_size: usize = b.getattr("size")?.extract()?;
    let rows = check_system_shape(shape, b_size).map_err(|e| PyValueError::new_err(e.to_string()))?;

    let x = cupy.call_method1("zeros", (rows, cupy.getattr("float64")?))?;
    let (a, b, inverse) = if reorder && rows > 1 {
        let (order, inverse) = device_rcm(&cupy, a)?;
        let all = PySlice::full_bound(py);
        let permuted = a.get_item(&order)?.get_item((all, &order))?;
        (permuted, b.get_item(&order)?, Some(inverse))
    } else {
        (a.clone(), b.clone(), None)
    };

    let system = CupySystem::extract(
        &a.getattr("indptr")?,
        &a.getattr("indices")?,
        &a.getattr("data")?,
        &b,
        &x,
        "float64",
    )?;
    run(py, system, true, SolverConfig::default())?;

    match inverse {
        Some(inverse) => x.get_item(&inverse),
        None => Ok(x),
    }
}

/// Get version information.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Python module definition.
#[pymodule]
fn cupy_chol(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // RUST_LOG controls the solver's diagnostics; a host process may
    // already have installed a logger.
    let _ = env_logger::try_init();

    m.add_function(wrap_pyfunction!(solve_cupy_csr, m)?)?;
    m.add_function(wrap_pyfunction!(solve_cupy_csr_ex, m)?)?;
    m.add_function(wrap_pyfunction!(compute_ordering, m)?)?;
    m.add_function(wrap_pyfunction!(cuchol_solve, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    Ok(())
}
