//! Build script for vdi-inception-layer
//!
//! Compiles the C bridge that forwards the variadic `open`/`openat` tail
//! and gives Rust access to the thread's `errno`.

fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "linux" {
        println!("cargo:rerun-if-changed=src/c/variadic_inception.c");

        cc::Build::new()
            .file("src/c/variadic_inception.c")
            .opt_level(3)
            .compile("variadic_inception");
    }
}
