//! Async seek-point indexing.
//!
//! This module provides [`SeekIndexFuture`], which opens and scans a file on
//! a Tokio blocking thread so the async runtime is never tied up with
//! packet-by-packet demuxing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bitscope::{BitscopeError, FfmpegLibrary, ScanOptions, index_async};
//!
//! # async fn example() -> Result<(), BitscopeError> {
//! let demuxer = index_async(Arc::new(FfmpegLibrary), "input.mp4", ScanOptions::new()).await?;
//! println!("{} frames", demuxer.frame_count());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::{
    backend::DemuxLibrary, configuration::ScanOptions, demuxer::PacketDemuxer,
    error::BitscopeError,
};

/// A future that resolves to a scanned [`PacketDemuxer`].
///
/// Dropping the future does not stop the scan; attach a
/// [`CancellationToken`](crate::CancellationToken) to the options for that.
pub struct SeekIndexFuture {
    handle: JoinHandle<Result<PacketDemuxer, BitscopeError>>,
}

impl Future for SeekIndexFuture {
    type Output = Result<PacketDemuxer, BitscopeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(BitscopeError::Cancelled)))
    }
}

/// Open and scan `path` on a blocking thread.
///
/// Must be called from within a Tokio runtime.
pub fn index_async<P: Into<PathBuf>>(
    library: Arc<dyn DemuxLibrary>,
    path: P,
    options: ScanOptions,
) -> SeekIndexFuture {
    let path = path.into();
    let handle = tokio::task::spawn_blocking(move || {
        PacketDemuxer::open(library.as_ref(), &path, None, Some(&options))
    });
    SeekIndexFuture { handle }
}
