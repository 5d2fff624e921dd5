extern crate bindgen;

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=wrapper.h");

    // Only the video capture and framebuffer parts of the UAPI are needed.
    let bindings = bindgen::Builder::default()
        .header("wrapper.h")
        .allowlist_type("v4l2_.*")
        .allowlist_type("fb_.*")
        .allowlist_var("V4L2_.*")
        .allowlist_var("FB.*")
        .generate()
        .expect("Failed to generate bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Failed to write bindings");
}
