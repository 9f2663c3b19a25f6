#![allow(missing_docs)]

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // protox compiles the schema in pure Rust, so no protoc is needed.
    let file_descriptor_set = protox::compile(["proto/onnx.proto"], ["proto/"])?;

    prost_build::Config::new().compile_fds(file_descriptor_set)?;

    println!("cargo:rerun-if-changed=proto/onnx.proto");

    Ok(())
}
