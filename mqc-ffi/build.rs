use std::env;
use std::fs;
use std::path::PathBuf;

const LIB_NAME: &str = "mqc";

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let target_dir = target_dir();

    println!("cargo:rerun-if-changed=cbindgen.toml");
    println!("cargo:rerun-if-changed=src");

    // Generate C header into target/include/
    let include_dir = target_dir.join("include");
    fs::create_dir_all(&include_dir).expect("Failed to create include directory");
    let header = include_dir.join(format!("{LIB_NAME}.h"));
    let config = cbindgen::Config::from_file(PathBuf::from(&crate_dir).join("cbindgen.toml"))
        .expect("Failed to read cbindgen.toml");
    cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
        .expect("Unable to generate bindings")
        .write_to_file(&header);
}

fn target_dir() -> PathBuf {
    // OUT_DIR is target/[{target}/]{profile}/build/{crate}-{hash}/out
    PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"))
        .parent() // build/{crate}-{hash}
        .and_then(|p| p.parent()) // build/
        .and_then(|p| p.parent()) // {profile}/
        .and_then(|p| p.parent()) // target/ or target/{target}/
        .expect("Failed to get target directory from OUT_DIR")
        .to_path_buf()
}
