use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc so builds don't depend on a system install
    let protoc = protoc_bin_vendored::protoc_bin_path()?;
    std::env::set_var("PROTOC", protoc);

    let protos = [PathBuf::from("proto/tfplugin6.9.proto")];
    let includes = [
        PathBuf::from("proto"),
        protoc_bin_vendored::include_path()?,
    ];

    tonic_build::configure()
        .build_client(false)
        .build_server(true)
        .compile_protos(&protos, &includes)?;

    println!("cargo:rerun-if-changed=proto/tfplugin6.9.proto");
    Ok(())
}
