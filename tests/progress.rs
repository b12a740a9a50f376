//! Progress reporting and cancellation of indexing scans.

mod common;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bitscope::{
    BitscopeError, CancellationToken, DemuxLibrary, IndexTask, OperationType, PacketDemuxer,
    ProgressCallback, ProgressInfo, ScanOptions, ScanOutcome,
};

use common::{FakeLibrary, gop_packets, placeholder_file, video_stream};

/// Ten frames with PTS 100..190 in a 200 ms container.
fn library() -> FakeLibrary {
    FakeLibrary::new(vec![video_stream(0, "hevc")], gop_packets(0)).with_duration(200_000)
}

#[derive(Default)]
struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    fn percentages(&self) -> Vec<f32> {
        self.infos
            .lock()
            .unwrap()
            .iter()
            .filter_map(|info| info.percentage)
            .collect()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

/// Cancels its token once a report reaches `threshold` percent.
struct CancelAt {
    token: CancellationToken,
    threshold: f32,
}

impl ProgressCallback for CancelAt {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.percentage.is_some_and(|percent| percent >= self.threshold) {
            self.token.cancel();
        }
    }
}

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

// ── Bitstream scans ────────────────────────────────────────────────

#[test]
fn scan_reports_percentages_up_to_completion() {
    let file = placeholder_file();
    let library = library();
    let progress = Arc::new(RecordingProgress::default());
    let options = ScanOptions::new().with_progress(progress.clone());

    PacketDemuxer::open(&library, file.path(), None, Some(&options)).unwrap();

    let percentages = progress.percentages();
    assert_eq!(percentages.first(), Some(&50.0));
    assert_eq!(percentages.last(), Some(&100.0));
    assert!(percentages.windows(2).all(|pair| pair[0] <= pair[1]));

    let infos = progress.infos.lock().unwrap();
    assert!(
        infos
            .iter()
            .all(|info| info.operation == OperationType::BitstreamIndexing)
    );
}

#[test]
fn scan_without_duration_only_reports_completion() {
    let file = placeholder_file();
    let library = FakeLibrary::new(vec![video_stream(0, "hevc")], gop_packets(0));
    let progress = Arc::new(RecordingProgress::default());
    let options = ScanOptions::new().with_progress(progress.clone());

    PacketDemuxer::open(&library, file.path(), None, Some(&options)).unwrap();
    assert_eq!(progress.percentages(), vec![100.0]);
}

#[test]
fn cancelled_open_returns_error() {
    let file = placeholder_file();
    let library = library();
    let token = CancellationToken::new();
    token.cancel();
    let options = ScanOptions::new().with_cancellation(token);

    let result = PacketDemuxer::open(&library, file.path(), None, Some(&options));
    match result {
        Err(BitscopeError::Cancelled) => {}
        other => panic!("Expected Cancelled, got: {other:?}"),
    }
    assert_eq!(library.reads(), 0);
}

#[test]
fn cancelled_rescan_keeps_partial_index() {
    let file = placeholder_file();
    let library = library();
    let mut demuxer = PacketDemuxer::open(&library, file.path(), None, None).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let outcome = demuxer
        .scan(&ScanOptions::new().with_cancellation(token))
        .unwrap();
    assert_eq!(outcome, ScanOutcome::Cancelled);
    assert!(demuxer.seek_index().is_empty());
}

#[test]
fn cancel_from_progress_callback_stops_mid_scan() {
    let file = placeholder_file();
    let library = library();
    let mut demuxer = PacketDemuxer::open(&library, file.path(), None, None).unwrap();

    let token = CancellationToken::new();
    let options = ScanOptions::new()
        .with_progress(Arc::new(CancelAt {
            token: token.clone(),
            threshold: 65.0,
        }))
        .with_cancellation(token);
    let outcome = demuxer.scan(&options).unwrap();

    assert_eq!(outcome, ScanOutcome::Cancelled);
    let points: Vec<(u64, i64)> = demuxer
        .seek_index()
        .points()
        .iter()
        .map(|point| (point.frame_index, point.dts))
        .collect();
    assert_eq!(points, vec![(0, 100), (3, 130)]);
    assert_eq!(demuxer.frame_count(), 4);
}

// ── IndexTask ──────────────────────────────────────────────────────

#[test]
fn index_task_returns_scanned_demuxer() {
    let file = placeholder_file();
    let library: Arc<dyn DemuxLibrary> = Arc::new(library());

    let task = IndexTask::spawn(library, file.path());
    assert_eq!(task.path(), file.path());
    let demuxer = task.join().expect("Indexing failed");
    assert_eq!(demuxer.frame_count(), 10);
    assert_eq!(demuxer.seek_index().len(), 3);
}

#[test]
fn index_task_forwards_progress() {
    let file = placeholder_file();
    let library: Arc<dyn DemuxLibrary> = Arc::new(library());
    let recorder = Arc::new(RecordingProgress::default());
    let options = ScanOptions::new().with_progress(recorder.clone());

    let mut task = IndexTask::spawn_with_options(library, file.path(), options);
    while !task.is_finished() {
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(task.poll_progress(), Some(100.0));
    assert_eq!(task.last_percent(), Some(100.0));
    assert_eq!(task.poll_progress(), None);
    assert_eq!(task.last_percent(), Some(100.0));

    task.join().expect("Indexing failed");
    // The caller's own callback saw the same run.
    assert_eq!(recorder.percentages().last(), Some(&100.0));
}

#[test]
fn index_task_honours_cancelled_token() {
    let file = placeholder_file();
    let library: Arc<dyn DemuxLibrary> = Arc::new(library());
    let token = CancellationToken::new();
    token.cancel();

    let task = IndexTask::spawn_with_options(
        library,
        file.path(),
        ScanOptions::new().with_cancellation(token),
    );
    match task.join() {
        Err(BitscopeError::Cancelled) => {}
        other => panic!("Expected Cancelled, got: {other:?}"),
    }
}
