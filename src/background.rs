//! Silent seek-point indexing on a worker thread.
//!
//! [`IndexTask`] opens an independent [`PacketDemuxer`] on its own thread and
//! scans it. The caller keeps a cancellable handle and drains progress
//! events from a channel whenever convenient; the worker never reaches back
//! into caller state.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, thread, time::Duration};
//!
//! use bitscope::{BitscopeError, FfmpegLibrary, IndexTask};
//!
//! let mut task = IndexTask::spawn(Arc::new(FfmpegLibrary), "input.mkv");
//! while !task.is_finished() {
//!     if let Some(percent) = task.poll_progress() {
//!         println!("{percent:.0}%");
//!     }
//!     thread::sleep(Duration::from_millis(200));
//! }
//! let demuxer = task.join()?;
//! println!("{} seek points", demuxer.seek_index().len());
//! # Ok::<(), BitscopeError>(())
//! ```

use std::path::PathBuf;
use std::sync::{
    Arc,
    mpsc::{self, Receiver, Sender},
};
use std::thread::{self, JoinHandle};

use crate::{
    backend::DemuxLibrary,
    configuration::ScanOptions,
    demuxer::PacketDemuxer,
    error::BitscopeError,
    progress::{CancellationToken, ProgressCallback, ProgressInfo},
};

/// Forwards progress to a channel and to the caller's own callback.
struct ChannelProgress {
    sender: Sender<ProgressInfo>,
    inner: Option<Arc<dyn ProgressCallback>>,
}

impl ProgressCallback for ChannelProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        // The receiver may already be gone.
        let _ = self.sender.send(info.clone());
        if let Some(inner) = &self.inner {
            inner.on_progress(info);
        }
    }
}

/// Handle to a seek-point scan running on a worker thread.
pub struct IndexTask {
    path: PathBuf,
    handle: Option<JoinHandle<Result<PacketDemuxer, BitscopeError>>>,
    token: CancellationToken,
    progress: Receiver<ProgressInfo>,
    last_percent: Option<f32>,
}

impl std::fmt::Debug for IndexTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexTask")
            .field("path", &self.path)
            .field("last_percent", &self.last_percent)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl IndexTask {
    /// Start indexing `path` with default scan options.
    pub fn spawn<P: Into<PathBuf>>(library: Arc<dyn DemuxLibrary>, path: P) -> Self {
        Self::spawn_with_options(library, path, ScanOptions::new())
    }

    /// Start indexing `path`. A progress callback in `options` still fires
    /// (on the worker thread); a cancellation token in `options` is honoured
    /// alongside [`cancel`](Self::cancel).
    pub fn spawn_with_options<P: Into<PathBuf>>(
        library: Arc<dyn DemuxLibrary>,
        path: P,
        options: ScanOptions,
    ) -> Self {
        let path = path.into();
        let token = options.cancellation.clone().unwrap_or_default();
        let (sender, receiver) = mpsc::channel();
        let inner = options.has_progress.then(|| options.progress.clone());
        let options = options
            .with_progress(Arc::new(ChannelProgress { sender, inner }))
            .with_cancellation(token.clone());

        let worker_path = path.clone();
        let handle = thread::spawn(move || {
            log::debug!("Background indexing of {}", worker_path.display());
            PacketDemuxer::open(library.as_ref(), &worker_path, None, Some(&options))
        });

        Self {
            path,
            handle: Some(handle),
            token,
            progress: receiver,
            last_percent: None,
        }
    }

    /// Path being indexed.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Ask the worker to stop at the next packet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Drain pending progress events and return the newest percentage, if
    /// any event arrived since the last call.
    pub fn poll_progress(&mut self) -> Option<f32> {
        let mut newest = None;
        for info in self.progress.try_iter() {
            newest = info.percentage.or(newest);
        }
        if newest.is_some() {
            self.last_percent = newest;
        }
        newest
    }

    /// The most recent percentage seen by [`poll_progress`](Self::poll_progress).
    pub fn last_percent(&self) -> Option<f32> {
        self.last_percent
    }

    /// Wait for the worker and return the indexed demuxer.
    ///
    /// # Errors
    ///
    /// Returns the open/scan error, [`BitscopeError::Cancelled`] after
    /// [`cancel`](Self::cancel), or [`BitscopeError::Demux`] if the worker
    /// panicked.
    pub fn join(mut self) -> Result<PacketDemuxer, BitscopeError> {
        let handle = self.handle.take().ok_or(BitscopeError::NotOpen)?;
        handle
            .join()
            .map_err(|_| BitscopeError::Demux("indexing thread panicked".to_string()))?
    }
}
