//! Scan and source configuration.
//!
//! [`ScanOptions`] threads progress callbacks and cancellation tokens through
//! indexing operations without polluting every function signature.
//! [`SourceOptions`] carries the settings that govern how files are opened
//! and read.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bitscope::{CancellationToken, ProgressCallback, ProgressInfo, ScanOptions, SourceOptions};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {:?}%", info.operation, info.percentage);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let scan = ScanOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone());
//! let source = SourceOptions::new().with_watch_files(false);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default chunk size for background statistics scans (1 MiB).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 1 << 20;

/// Configuration for indexing scans.
///
/// A default-constructed value is a *silent* scan: no progress sink and no
/// way to cancel.
#[derive(Clone)]
pub struct ScanOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Whether a real progress sink was attached.
    pub(crate) has_progress: bool,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
}

impl Debug for ScanOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScanOptions")
            .field("has_progress", &self.has_progress)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish()
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOptions {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            has_progress: false,
            cancellation: None,
        }
    }

    /// Attach a progress callback.
    ///
    /// The callback fires whenever the integer percentage changes.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self.has_progress = true;
        self
    }

    /// Attach a cancellation token.
    ///
    /// A cancelled bitstream scan reports
    /// [`ScanOutcome::Cancelled`](crate::ScanOutcome::Cancelled); its partial
    /// index must not be used for playback.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Settings for opening files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    /// Install a file-system watch on opened files. Defaults to `true`.
    pub watch_files: bool,
    /// Bytes read per refill by background statistics scans.
    pub read_chunk_size: usize,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            watch_files: true,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl SourceOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable file-system watches.
    #[must_use]
    pub fn with_watch_files(mut self, watch: bool) -> Self {
        self.watch_files = watch;
        self
    }

    /// Set the background scan chunk size. Clamped to a minimum of 1 byte.
    #[must_use]
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }
}
