//! Build utilities for the CUDA FFI crates.
//!
//! Locates the CUDA toolkit and emits the cargo link directives for the
//! runtime, cuSPARSE and cuSOLVER libraries.

use std::env;
use std::path::{Path, PathBuf};

/// CUDA library information
#[derive(Debug, Clone)]
pub struct CudaLib {
    pub name: &'static str,
    pub header: &'static str,
    pub lib_name: &'static str,
}

/// CUDA libraries linked by this workspace
pub mod libs {
    use super::CudaLib;

    pub const CUDA_RUNTIME: CudaLib = CudaLib {
        name: "CUDA Runtime",
        header: "cuda_runtime.h",
        lib_name: "cudart",
    };

    pub const CUSPARSE: CudaLib = CudaLib {
        name: "cuSPARSE",
        header: "cusparse_v2.h",
        lib_name: "cusparse",
    };

    pub const CUSOLVER: CudaLib = CudaLib {
        name: "cusolverSp",
        header: "cusolverSp.h",
        lib_name: "cusolver",
    };
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

/// Finds `nvcc` on `PATH` and returns the toolkit root above its `bin/`.
pub fn cuda_path_from_nvcc() -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    let names: &[&str] = if cfg!(windows) { &["nvcc.exe"] } else { &["nvcc"] };
    for dir in env::split_paths(&path) {
        for name in names {
            let candidate = dir.join(name);
            if candidate.exists() {
                return candidate.parent()?.parent().map(Path::to_path_buf);
            }
        }
    }
    None
}

/// Detects the CUDA installation path.
///
/// Checks in order:
/// 1. `CUDA_PATH` environment variable
/// 2. `CUDA_HOME` environment variable
/// 3. The toolkit that owns the `nvcc` found on `PATH`
/// 4. Default Windows path: `C:\Program Files\NVIDIA GPU Computing Toolkit\CUDA\v12.x`
/// 5. Default Linux path: `/usr/local/cuda`
pub fn detect_cuda_path() -> Option<PathBuf> {
    for var in ["CUDA_PATH", "CUDA_HOME"] {
        if let Ok(path) = env::var(var) {
            if let Some(p) = existing(PathBuf::from(&path)) {
                return Some(p);
            }
        }
    }

    if let Some(p) = cuda_path_from_nvcc() {
        return Some(p);
    }

    #[cfg(target_os = "windows")]
    {
        let versions = ["v12.6", "v12.5", "v12.4", "v12.3", "v12.2", "v12.1", "v12.0", "v11.8"];
        for ver in versions {
            let path = PathBuf::from(format!(
                r"C:\Program Files\NVIDIA GPU Computing Toolkit\CUDA\{ver}"
            ));
            if path.exists() {
                return Some(path);
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(p) = existing(PathBuf::from("/usr/local/cuda")) {
            return Some(p);
        }
    }

    None
}

/// Returns the library search path for CUDA.
pub fn cuda_lib_path() -> Option<PathBuf> {
    let cuda_path = detect_cuda_path()?;

    #[cfg(target_os = "windows")]
    {
        Some(cuda_path.join("lib").join("x64"))
    }

    #[cfg(target_os = "linux")]
    {
        Some(cuda_path.join("lib64"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux")))]
    {
        Some(cuda_path.join("lib"))
    }
}

/// Returns the include path for CUDA headers.
pub fn cuda_include_path() -> Option<PathBuf> {
    detect_cuda_path().map(|p| p.join("include"))
}

/// Emits cargo directives to link a CUDA library.
///
/// This function should be called from a `build.rs` script.
pub fn link_cuda_lib(lib: &CudaLib) {
    if let Some(lib_path) = cuda_lib_path() {
        println!("cargo:rustc-link-search=native={}", lib_path.display());
    } else {
        println!(
            "cargo:warning=CUDA toolkit not found; linking {} ({}) from the default search path",
            lib.name, lib.lib_name
        );
    }
    println!("cargo:rustc-link-lib={}", lib.lib_name);
}

/// Emits cargo directives to link the CUDA runtime.
pub fn link_cuda_runtime() {
    link_cuda_lib(&libs::CUDA_RUNTIME);
}

/// Parses `major.minor` from the front of a dotted version string.
fn parse_major_minor(ver: &str) -> Option<(u32, u32)> {
    let mut parts = ver.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.trim_matches(|c: char| !c.is_ascii_digit()).parse().ok()?;
    Some((major, minor))
}

/// Pulls `"version" : "X.Y.Z"` out of the `"cuda"` entry of `version.json`.
fn parse_version_json(content: &str) -> Option<(u32, u32)> {
    let cuda = &content[content.find("\"cuda\"")?..];
    let after_key = &cuda[cuda.find("\"version\"")? + "\"version\"".len()..];
    let start = after_key.find('"')? + 1;
    let end = start + after_key[start..].find('"')?;
    parse_major_minor(&after_key[start..end])
}

/// Detects and returns the CUDA version as (major, minor).
pub fn detect_cuda_version() -> Option<(u32, u32)> {
    let cuda_path = detect_cuda_path()?;

    // Windows style: vX.Y
    if let Some(name) = cuda_path.file_name().and_then(|n| n.to_str()) {
        if let Some(ver) = name.strip_prefix('v') {
            if let Some(v) = parse_major_minor(ver) {
                return Some(v);
            }
        }
    }

    // CUDA >= 11.1
    if let Ok(content) = std::fs::read_to_string(cuda_path.join("version.json")) {
        if let Some(v) = parse_version_json(&content) {
            return Some(v);
        }
    }

    // Older toolkits: "CUDA Version X.Y.Z"
    if let Ok(content) = std::fs::read_to_string(cuda_path.join("version.txt")) {
        if let Some(ver_str) = content.strip_prefix("CUDA Version ") {
            return parse_major_minor(ver_str);
        }
    }

    None
}

/// Prints build information and warns when `CUDA_PATH` disagrees with `nvcc`.
pub fn print_build_info() {
    println!("cargo:rerun-if-env-changed=CUDA_PATH");
    println!("cargo:rerun-if-env-changed=CUDA_HOME");

    if let (Ok(cuda_path), Some(nvcc_root)) = (env::var("CUDA_PATH"), cuda_path_from_nvcc()) {
        if !cuda_path.is_empty() && PathBuf::from(&cuda_path) != nvcc_root {
            println!(
                "cargo:warning=nvcc path != CUDA_PATH (nvcc: {}, CUDA_PATH: {})",
                nvcc_root.display(),
                cuda_path
            );
        }
    }

    let _ = detect_cuda_version();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_cuda_path() {
        // This test may fail if CUDA is not installed
        let path = detect_cuda_path();
        println!("Detected CUDA path: {:?}", path);
    }

    #[test]
    fn test_parse_major_minor() {
        assert_eq!(parse_major_minor("12.3.107"), Some((12, 3)));
        assert_eq!(parse_major_minor("11.8"), Some((11, 8)));
        assert_eq!(parse_major_minor("12"), None);
        assert_eq!(parse_major_minor("x.y"), None);
    }

    #[test]
    fn test_parse_version_json() {
        let content = r#"{
   "cuda" : {
      "name" : "CUDA SDK",
      "version" : "12.4.1"
   },
   "cuda_cudart" : {
      "name" : "CUDA Runtime (cudart)",
      "version" : "12.4.127"
   }
}"#;
        assert_eq!(parse_version_json(content), Some((12, 4)));
        assert_eq!(parse_version_json("{}"), None);
    }
}
