use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: &[&str] = &[
    "FFMPEG_DIR",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // ffmpeg-sys-next finds FFmpeg through pkg-config everywhere except
    // Windows, where it needs FFMPEG_DIR.
    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows" {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match env::var("VCPKG_ROOT") {
        Ok(root) => report_vcpkg_install(&vcpkg_install_dir(&root)),
        Err(_) => println!(
            "cargo:warning=FFMPEG_DIR is not set. thumbsheet needs FFmpeg development libraries; on Windows install them with vcpkg and set FFMPEG_DIR."
        ),
    }
}

fn vcpkg_install_dir(root: &str) -> PathBuf {
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    PathBuf::from(root).join("installed").join(triplet)
}

fn report_vcpkg_install(dir: &Path) {
    if !dir.exists() {
        println!(
            "cargo:warning=VCPKG_ROOT is set but {} does not contain an FFmpeg install.",
            dir.display(),
        );
        return;
    }

    println!(
        "cargo:warning=Found vcpkg FFmpeg at {0}. Export FFMPEG_DIR={0} to silence this message.",
        dir.display(),
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg build.");
    }
}
