//! Compiles `proto/fabula.proto` with the pure-Rust `protox` compiler, so
//! the build needs no `protoc` binary, and generates the tonic services.
//! The encoded descriptor set is also written to `OUT_DIR` for the
//! reflection service.

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use prost::Message;

const PROTO: &str = "proto/fabula.proto";

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed={PROTO}");

    let descriptors = protox::compile([PROTO], ["proto"])?;
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    fs::write(
        out_dir.join("fabula_descriptor.bin"),
        descriptors.encode_to_vec(),
    )?;

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_fds(descriptors)?;
    Ok(())
}
