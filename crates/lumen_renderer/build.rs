// Build script for linking Embree library
//
// Only the `embree` feature needs the native library. Set EMBREE_DIR to an
// Embree 4 install prefix when it is not on the default linker path.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=EMBREE_DIR");

    if std::env::var_os("CARGO_FEATURE_EMBREE").is_none() {
        return;
    }

    println!("cargo:rustc-link-lib=embree4");

    if let Ok(embree_dir) = std::env::var("EMBREE_DIR") {
        let lib_path = std::path::Path::new(&embree_dir).join("lib");
        println!("cargo:rustc-link-search=native={}", lib_path.display());
    }
}
