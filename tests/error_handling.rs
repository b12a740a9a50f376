//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions.

mod common;

use std::io::Error as IoError;

use bitscope::{BitscopeError, FfmpegLibrary, PacketDemuxer, StatisticsFile};

use common::{FakeLibrary, audio_stream, gop_packets, placeholder_file};

#[test]
fn open_nonexistent_file() {
    let result = PacketDemuxer::open(&FfmpegLibrary, "this_file_does_not_exist.mp4", None, None);
    let error_message = result.unwrap_err().to_string();
    assert!(
        error_message.starts_with("Failed to open file at this_file_does_not_exist.mp4"),
        "Error message should mention file open failure: {error_message}",
    );
}

#[test]
fn open_directory() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = PacketDemuxer::open(&FfmpegLibrary, directory.path(), None, None);
    match result {
        Err(BitscopeError::NotAFile(path)) => assert_eq!(path, directory.path()),
        other => panic!("Expected NotAFile, got: {other:?}"),
    }
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = PacketDemuxer::open(&FfmpegLibrary, &invalid_file_path, None, None);
    assert!(
        matches!(result, Err(BitscopeError::FileOpen { .. })),
        "Expected FileOpen for invalid media file",
    );
}

#[test]
fn open_without_video_stream() {
    let file = placeholder_file();
    let library = FakeLibrary::new(vec![audio_stream(0)], gop_packets(0));
    let error = PacketDemuxer::open(&library, file.path(), None, None).unwrap_err();
    assert_eq!(error.to_string(), "No video stream found in file");
}

#[test]
fn statistics_file_of_unknown_format() {
    let file = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .expect("Failed to create temp file");
    std::fs::write(file.path(), b"frame,type\n").expect("Failed to write file");

    let error = StatisticsFile::open(file.path()).unwrap_err();
    assert!(
        matches!(error, BitscopeError::StatisticsStructure(_)),
        "Expected StatisticsStructure, got: {error:?}",
    );
    assert!(error.to_string().starts_with("Error while parsing meta data: "));
}

// ── Messages ───────────────────────────────────────────────────────

#[test]
fn error_messages() {
    let seek = BitscopeError::Seek {
        timestamp: 4200,
        reason: "Operation not permitted".to_string(),
    };
    assert_eq!(
        seek.to_string(),
        "Failed to seek to timestamp 4200: Operation not permitted"
    );

    let parse = BitscopeError::StatisticsParse {
        offset: 128,
        message: "invalid POC \"x\"".to_string(),
    };
    assert_eq!(
        parse.to_string(),
        "Error while parsing statistics at byte 128: invalid POC \"x\""
    );

    let exhausted = BitscopeError::BitstreamExhausted {
        needed: 8,
        available: 3,
    };
    assert_eq!(
        exhausted.to_string(),
        "Bitstream read past end of buffer (needed 8 bits, 3 left)"
    );

    assert_eq!(BitscopeError::Cancelled.to_string(), "Operation cancelled");
    assert_eq!(BitscopeError::NotOpen.to_string(), "Demuxer is not open");
}

// ── Conversions ────────────────────────────────────────────────────

#[test]
fn ffmpeg_end_of_file_becomes_end_of_stream() {
    let error = BitscopeError::from(ffmpeg_next::Error::Eof);
    assert!(matches!(error, BitscopeError::EndOfStream));
}

#[test]
fn other_ffmpeg_errors_become_demux_errors() {
    let error = BitscopeError::from(ffmpeg_next::Error::InvalidData);
    match error {
        BitscopeError::Demux(message) => assert!(!message.is_empty()),
        other => panic!("Expected Demux, got: {other:?}"),
    }
}

#[test]
fn io_and_watch_errors_convert() {
    let error: BitscopeError = IoError::other("disk on fire").into();
    assert_eq!(error.to_string(), "I/O error: disk on fire");

    let error: BitscopeError = notify::Error::generic("watch limit reached").into();
    assert!(matches!(error, BitscopeError::Watch(_)));
    assert!(error.to_string().starts_with("File watch error: "));
}
