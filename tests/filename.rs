//! Frame size, rate, and bit depth hints from file names.

use std::path::Path;

use bitscope::{FileNameFormat, absolute_path_from_abs_and_rel};

#[test]
fn size_rate_and_depth() {
    let format = FileNameFormat::from_path("Kimono_1920x1080_24_10b.yuv");
    assert_eq!(format.frame_size, Some((1920, 1080)));
    assert_eq!(format.frame_rate, Some(24.0));
    assert_eq!(format.bit_depth, Some(10));
    assert!(!format.packed);
}

#[test]
fn size_and_rate() {
    let format = FileNameFormat::from_path("BasketballDrive_1920x1080_50.yuv");
    assert_eq!(format.frame_size, Some((1920, 1080)));
    assert_eq!(format.frame_rate, Some(50.0));
    assert_eq!(format.bit_depth, None);
}

#[test]
fn size_only() {
    let format = FileNameFormat::from_path("sequence_416x240.yuv");
    assert_eq!(format.frame_size, Some((416, 240)));
    assert_eq!(format.frame_rate, None);
    assert_eq!(format.bit_depth, None);
}

#[test]
fn rate_and_depth_keywords() {
    let format = FileNameFormat::from_path("Traffic_2560x1600_30fps_8bit.yuv");
    assert_eq!(format.frame_size, Some((2560, 1600)));
    assert_eq!(format.frame_rate, Some(30.0));
    assert_eq!(format.bit_depth, Some(8));
}

#[test]
fn packed_marker() {
    let format = FileNameFormat::from_path("clip_1280x720_packed.yuv");
    assert_eq!(format.frame_size, Some((1280, 720)));
    assert!(format.packed);
}

#[test]
fn named_sizes() {
    assert_eq!(
        FileNameFormat::from_path("foreman_cif.yuv").frame_size,
        Some((352, 288))
    );
    assert_eq!(
        FileNameFormat::from_path("foreman_qcif.yuv").frame_size,
        Some((176, 144))
    );
    assert_eq!(
        FileNameFormat::from_path("city_4cif.yuv").frame_size,
        Some((704, 576))
    );
}

#[test]
fn folder_name_supplies_missing_values() {
    let format = FileNameFormat::from_path("720p50/clip.yuv");
    assert_eq!(format.frame_size, Some((1280, 720)));
    assert_eq!(format.frame_rate, Some(50.0));
}

#[test]
fn file_name_takes_precedence_over_folder() {
    let format = FileNameFormat::from_path("1080p25/Kimono_832x480_60.yuv");
    assert_eq!(format.frame_size, Some((832, 480)));
    assert_eq!(format.frame_rate, Some(60.0));
}

#[test]
fn rate_without_size_is_ignored() {
    let format = FileNameFormat::from_path("clip_30fps.yuv");
    assert_eq!(format, FileNameFormat::default());
}

#[test]
fn inspect_fills_only_unknown_fields() {
    let mut format = FileNameFormat {
        frame_rate: Some(60.0),
        ..FileNameFormat::default()
    };
    format.inspect("clip_416x240_30.yuv");
    assert_eq!(format.frame_size, Some((416, 240)));
    // The size pattern also carries a rate and replaces the preset one.
    assert_eq!(format.frame_rate, Some(30.0));

    let mut format = FileNameFormat {
        frame_size: Some((64, 64)),
        ..FileNameFormat::default()
    };
    format.inspect("clip_416x240_30fps.yuv");
    assert_eq!(format.frame_size, Some((64, 64)));
    assert_eq!(format.frame_rate, Some(30.0));
}

// ── Relative paths ─────────────────────────────────────────────────

#[test]
fn existing_absolute_path_wins() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let target = directory.path().join("bitstream.hevc");
    std::fs::write(&target, b"x").expect("Failed to write file");

    let resolved = absolute_path_from_abs_and_rel(
        &directory.path().join("stats.csv"),
        &target,
        Path::new("missing.hevc"),
    );
    assert_eq!(resolved, Some(target));
}

#[test]
fn relative_path_resolved_against_current_file() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::create_dir(directory.path().join("streams")).expect("Failed to create dir");
    std::fs::create_dir(directory.path().join("stats")).expect("Failed to create dir");
    let target = directory.path().join("streams").join("bitstream.hevc");
    std::fs::write(&target, b"x").expect("Failed to write file");

    let resolved = absolute_path_from_abs_and_rel(
        &directory.path().join("stats").join("decoder.csv"),
        Path::new("/nonexistent/elsewhere/bitstream.hevc"),
        Path::new("../streams/bitstream.hevc"),
    );
    assert_eq!(resolved, Some(target));
}

#[test]
fn unresolvable_path() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let resolved = absolute_path_from_abs_and_rel(
        &directory.path().join("decoder.csv"),
        Path::new("/nonexistent/bitstream.hevc"),
        Path::new("bitstream.hevc"),
    );
    assert_eq!(resolved, None);
}
