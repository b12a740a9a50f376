//! FFmpeg demux library against a real container.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`
//! and return early when they are missing.

use std::path::Path;

use bitscope::{DemuxLibrary, FfmpegLibrary, PacketDemuxer, PacketKind, ScanOptions};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

#[test]
fn library_name() {
    assert_eq!(FfmpegLibrary.name(), "FFmpeg");
}

#[test]
fn open_and_index_sample() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let demuxer = PacketDemuxer::open(&FfmpegLibrary, path, None, Some(&ScanOptions::new()))
        .expect("Failed to open sample video");
    assert!(demuxer.metadata().width > 0);
    assert!(demuxer.frame_count() > 0);
    assert!(!demuxer.seek_index().is_empty());
    assert_eq!(demuxer.seek_index().points()[0].frame_index, 0);
    assert!(demuxer.validate().is_valid());
}

#[test]
fn walk_sample_units() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut demuxer =
        PacketDemuxer::open(&FfmpegLibrary, path, None, None).expect("Failed to open sample video");
    let first = demuxer
        .next_packet(false, true)
        .expect("Expected a video packet");
    assert_eq!(first.kind, PacketKind::Video);
    assert!(demuxer.access_unit_format().is_some());

    demuxer.seek_to_start().expect("Failed to rewind");
    let mut units = 0;
    while demuxer.next_unit(false).is_some() {
        units += 1;
        if units == 32 {
            break;
        }
    }
    assert!(units > 0);
}
