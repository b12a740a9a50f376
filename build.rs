use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 5] = [
    "FFMPEG_DIR",
    "FFMPEG_PKG_CONFIG_PATH",
    "VCPKG_ROOT",
    "VCPKGRS_DYNAMIC",
    "VCPKGRS_TRIPLET",
];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // An explicit FFmpeg location wins on every platform.
    if let Some(dir) = env::var_os("FFMPEG_DIR") {
        let dir = PathBuf::from(dir);
        if !dir.join("include").join("libavformat").exists() {
            println!(
                "cargo:warning=FFMPEG_DIR={} has no include/libavformat; bitscope needs the libavformat and libavcodec headers.",
                dir.display()
            );
        }
        return;
    }

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" {
        report_vcpkg();
    }
}

fn report_vcpkg() {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=FFMPEG_DIR is not set. On Windows, install FFmpeg via vcpkg and set VCPKG_ROOT + FFMPEG_DIR so ffmpeg-sys-next can find it."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install_dir = Path::new(&vcpkg_root).join("installed").join(&triplet);
    if !install_dir.exists() {
        println!(
            "cargo:warning=VCPKG_ROOT is set but no {triplet} FFmpeg install was found at {}.",
            install_dir.display()
        );
        return;
    }

    println!(
        "cargo:warning=Found vcpkg FFmpeg at {0}. Set FFMPEG_DIR={0} to make discovery explicit.",
        install_dir.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!(
            "cargo:warning=Set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg build."
        );
    }
}
