use cuda_build::{detect_cuda_version, libs, link_cuda_lib, print_build_info};

fn main() {
    if std::env::var("CARGO_FEATURE_STUB").is_ok() {
        println!("cargo:rerun-if-env-changed=CARGO_FEATURE_STUB");
        return;
    }
    print_build_info();

    // csrlsvchol is deprecated in 12.x but still shipped.
    if let Some((major, minor)) = detect_cuda_version() {
        if major < 10 {
            println!("cargo:warning=CUDA {major}.{minor} predates cusolverSp csrlsvchol");
        }
    }
    link_cuda_lib(&libs::CUSOLVER);

    println!("cargo:rerun-if-changed=build.rs");
}
