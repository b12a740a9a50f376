//! ScanOptions and SourceOptions builders.

use std::sync::Arc;

use bitscope::{
    CancellationToken, DEFAULT_READ_CHUNK_SIZE, ProgressCallback, ProgressInfo, ScanOptions,
    SourceOptions,
};

struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

// ── ScanOptions ────────────────────────────────────────────────────

#[test]
fn scan_options_defaults() {
    let options = ScanOptions::new();
    let debug = format!("{options:?}");
    assert!(debug.contains("ScanOptions"));
    assert!(debug.contains("has_progress: false"));
    assert!(debug.contains("has_cancellation: false"));
}

#[test]
fn scan_options_with_progress_and_cancellation() {
    let options = ScanOptions::default()
        .with_progress(Arc::new(Silent))
        .with_cancellation(CancellationToken::new());
    let debug = format!("{options:?}");
    assert!(debug.contains("has_progress: true"));
    assert!(debug.contains("has_cancellation: true"));
}

// ── SourceOptions ──────────────────────────────────────────────────

#[test]
fn source_options_defaults() {
    let options = SourceOptions::new();
    assert!(options.watch_files);
    assert_eq!(options.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
    assert_eq!(DEFAULT_READ_CHUNK_SIZE, 1024 * 1024);
    assert_eq!(options, SourceOptions::default());
}

#[test]
fn source_options_builders() {
    let options = SourceOptions::new()
        .with_watch_files(false)
        .with_read_chunk_size(4096);
    assert!(!options.watch_files);
    assert_eq!(options.read_chunk_size, 4096);
}

#[test]
fn source_options_chunk_size_clamps_zero() {
    let options = SourceOptions::new().with_read_chunk_size(0);
    assert_eq!(options.read_chunk_size, 1);
}
