//! Build script for picox-session
//!
//! Compiles the MicroPython command templates under `templates/` into
//! one-line remote commands and embeds them as Rust constants, so the
//! library needs no template files at runtime.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let templates = manifest_dir.join("templates");

    println!("cargo:rerun-if-changed={}", templates.display());
    for entry in fs::read_dir(&templates).unwrap() {
        println!("cargo:rerun-if-changed={}", entry.unwrap().path().display());
    }

    let commands = match picox_compiler::compile_dir(&templates) {
        Ok(commands) => commands,
        Err(e) => panic!("Failed to compile templates in {}: {}", templates.display(), e),
    };

    let generated = out_dir.join("commands.rs");
    fs::write(&generated, picox_compiler::generate_rust(&commands)).unwrap();
}
