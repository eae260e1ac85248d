use cuda_build::{libs, link_cuda_lib, print_build_info};

fn main() {
    if std::env::var("CARGO_FEATURE_STUB").is_ok() {
        println!("cargo:rerun-if-env-changed=CARGO_FEATURE_STUB");
        return;
    }
    print_build_info();
    link_cuda_lib(&libs::CUSPARSE);

    println!("cargo:rerun-if-changed=build.rs");
}
