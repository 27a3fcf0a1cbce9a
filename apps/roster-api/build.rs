//! Build script for compiling Protocol Buffer definitions.
//!
//! This script compiles `proto/roster.proto` into Rust code using tonic-build.
//! The generated code is placed in `$OUT_DIR` and included via `tonic::include_proto!`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/roster.proto");

    // Clients are exported for Rust callers of the service.
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../../proto/roster.proto"], &["../../proto"])?;

    Ok(())
}
