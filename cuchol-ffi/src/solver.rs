//! Reusable solver handles.
//!
//! A handle owns one cusolverSp context and its matrix descriptor, so
//! repeated solves skip context creation. Each handle has its own lock: the
//! registry lock is only held to look a handle up, never across a solve.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cuchol::{CholeskySolver, SolverConfig};
use libc::{c_char, c_int};

use crate::error::{fail, invalid, read_utf8, set_last_error, with_panic_boundary};
use crate::solve::{solve_raw, wrap_raw};
use crate::CucholResult;

lazy_static::lazy_static! {
    static ref SOLVERS: Mutex<HandleManager<CholeskySolver>> = Mutex::new(HandleManager::new());
}

struct HandleManager<T> {
    handles: HashMap<u64, Arc<Mutex<T>>>,
    next_id: u64,
}

impl<T> HandleManager<T> {
    fn new() -> Self {
        Self {
            handles: HashMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, value: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.handles.insert(id, Arc::new(Mutex::new(value)));
        id
    }

    fn get(&self, id: u64) -> Option<Arc<Mutex<T>>> {
        self.handles.get(&id).cloned()
    }

    /// Unregisters `id`. A solve already running on it keeps its own
    /// reference and the solver is released when that solve returns.
    fn remove(&mut self, id: u64) -> Option<Arc<Mutex<T>>> {
        self.handles.remove(&id)
    }
}

pub type CucholSolverHandle = u64;

fn register(context: &str, config: SolverConfig, handle: *mut CucholSolverHandle) -> CucholResult {
    match CholeskySolver::new(config) {
        Ok(solver) => {
            let id = SOLVERS.lock().unwrap().insert(solver);
            unsafe { *handle = id };
            log::debug!("{context}: registered solver {id}");
            CucholResult::Success
        }
        Err(e) => fail(context, &e),
    }
}

/// Create a solver with the default configuration.
#[no_mangle]
pub extern "C" fn cuchol_solver_create(handle: *mut CucholSolverHandle) -> CucholResult {
    with_panic_boundary("cuchol_solver_create", || {
        if handle.is_null() {
            return invalid("cuchol_solver_create", "handle pointer is null");
        }
        register("cuchol_solver_create", SolverConfig::default(), handle)
    })
}

/// Create a solver from a UTF-8 JSON configuration, for example
/// `{"tolerance": 1e-12, "reorder": "symamd", "on_singular": "error"}`.
/// Missing keys take their defaults.
#[no_mangle]
pub extern "C" fn cuchol_solver_create_from_json(
    config_ptr: *const c_char,
    config_len: usize,
    handle: *mut CucholSolverHandle,
) -> CucholResult {
    const CONTEXT: &str = "cuchol_solver_create_from_json";
    with_panic_boundary(CONTEXT, || {
        if handle.is_null() {
            return invalid(CONTEXT, "handle pointer is null");
        }
        let json = match read_utf8(config_ptr, config_len, "config") {
            Ok(s) => s,
            Err(code) => return code,
        };
        let config = match SolverConfig::from_json(&json) {
            Ok(c) => c,
            Err(e) => return invalid(CONTEXT, &e.to_string()),
        };
        register(CONTEXT, config, handle)
    })
}

/// Solve with a registered solver; arguments as in `cuchol_solve_csr_f64`.
///
/// Returns `ErrorSingular` only when the solver was configured with
/// `"on_singular": "error"`; the row is written to `singularity_out` either way.
#[no_mangle]
pub unsafe extern "C" fn cuchol_solver_solve_f64(
    handle: CucholSolverHandle,
    row_ptr: *const c_int,
    col_ind: *const c_int,
    values: *const f64,
    b: *const f64,
    x: *mut f64,
    n: c_int,
    nnz: c_int,
    singularity_out: *mut c_int,
) -> CucholResult {
    const CONTEXT: &str = "cuchol_solver_solve_f64";
    with_panic_boundary(CONTEXT, || {
        if !singularity_out.is_null() {
            *singularity_out = -1;
        }
        let system = match wrap_raw(CONTEXT, row_ptr, col_ind, values, b, x, n, nnz) {
            Ok(s) => s,
            Err(code) => return code,
        };
        let entry = SOLVERS.lock().unwrap().get(handle);
        match entry {
            Some(solver) => {
                let solver = solver.lock().unwrap();
                solve_raw(CONTEXT, &solver, system, singularity_out)
            }
            None => {
                set_last_error(&format!("{CONTEXT}: unknown handle {handle}"));
                CucholResult::ErrorInvalidHandle
            }
        }
    })
}

/// Destroy a solver handle.
#[no_mangle]
pub extern "C" fn cuchol_solver_destroy(handle: CucholSolverHandle) -> CucholResult {
    with_panic_boundary("cuchol_solver_destroy", || {
        let mut solvers = SOLVERS.lock().unwrap();
        match solvers.remove(handle) {
            Some(_) => CucholResult::Success,
            None => CucholResult::ErrorInvalidHandle,
        }
    })
}
