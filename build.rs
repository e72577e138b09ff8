use std::env;
use std::fs;
use std::path::PathBuf;

// nRF52840: 1 MiB flash, 256 KiB RAM, no SoftDevice
const MEMORY_X: &str = "MEMORY
{
  FLASH : ORIGIN = 0x00000000, LENGTH = 1024K
  RAM : ORIGIN = 0x20000000, LENGTH = 256K
}
";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (tests, docs) need no linker script
    if env::var_os("CARGO_FEATURE_NRF").is_none() {
        return;
    }

    // Get the output directory
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    fs::write(out_dir.join("memory.x"), MEMORY_X).unwrap();

    // Tell cargo to look in the output directory for linker scripts
    println!("cargo:rustc-link-search={}", out_dir.display());

    // CRITICAL: Add --nmagic linker argument, plus the cortex-m-rt and defmt scripts
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
