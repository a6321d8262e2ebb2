// Build script to regenerate the checked-in gRPC bindings.
//
// Generation needs `protoc`, so it only runs when HELLO_PROTO_REGENERATE is
// set. Normal builds use `src/generated/hello.rs` as committed.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/hello.proto");
    println!("cargo:rerun-if-env-changed=HELLO_PROTO_REGENERATE");

    if std::env::var_os("HELLO_PROTO_REGENERATE").is_none() {
        return Ok(());
    }

    tonic_build::configure()
        .out_dir("src/generated")
        .compile_protos(&["../../proto/hello.proto"], &["../../proto/"])?;

    // The proto declares no package, so prost names the output `_.rs`.
    std::fs::rename("src/generated/_.rs", "src/generated/hello.rs")?;

    Ok(())
}
