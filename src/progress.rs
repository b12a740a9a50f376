//! Progress reporting and cancellation support.
//!
//! This module provides [`ProgressCallback`] for monitoring long-running
//! scans, [`CancellationToken`] for cooperative cancellation, and
//! [`ProgressInfo`] for progress snapshots.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bitscope::{
//!     BitscopeError, FfmpegLibrary, PacketDemuxer, ProgressCallback, ProgressInfo,
//!     ScanOptions,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.0}% indexed", info.operation);
//!         }
//!     }
//! }
//!
//! let options = ScanOptions::new().with_progress(Arc::new(PrintProgress));
//! let demuxer = PacketDemuxer::open(&FfmpegLibrary, "input.mkv", None, Some(&options))?;
//! # Ok::<(), BitscopeError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of operation currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// One-pass random-access scan of a compressed bitstream.
    BitstreamIndexing,
    /// Background frame/type offset scan of a statistics file.
    StatisticsIndexing,
}

/// A snapshot of scan progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items (packets / lines) have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0 – 100), if it can be derived.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates during a scan.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks may be
/// invoked from background indexing threads.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// operation. Use [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called whenever the integer completion percentage changes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to request
/// cancellation. Bitstream scans check it once per packet, statistics scans
/// once per buffer refill.
///
/// # Example
///
/// ```
/// use bitscope::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks a percentage and only fires the callback when its integer value
/// changes, so a slow progress sink is not flooded once per packet.
pub(crate) struct PercentTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    last_percent: i32,
    start_time: Instant,
}

impl PercentTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            last_percent: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one processed item at the given percentage.
    ///
    /// Returns `true` if a report was emitted.
    pub(crate) fn advance(&mut self, percent: i32) -> bool {
        self.current += 1;
        let percent = percent.clamp(0, 100);
        if percent == self.last_percent {
            return false;
        }
        self.last_percent = percent;
        self.report(percent);
        true
    }

    /// Unconditionally emit a final 100% report.
    pub(crate) fn finish(&mut self) {
        self.last_percent = 100;
        self.report(100);
    }

    fn report(&self, percent: i32) {
        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage: Some(percent as f32),
            elapsed: self.start_time.elapsed(),
        };
        self.callback.on_progress(&info);
    }
}
