//! Parallel seek-point indexing of many files.
//!
//! Each worker opens its own demuxer so there is no shared mutable state.

use std::path::{Path, PathBuf};

use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    backend::DemuxLibrary, configuration::ScanOptions, demuxer::PacketDemuxer,
    error::BitscopeError, keyframe::SeekIndex,
};

/// Scan every path in `paths` on the rayon thread pool.
///
/// Results are returned in input order. A cancelled token makes the
/// remaining files fail with [`BitscopeError::Cancelled`].
///
/// # Example
///
/// ```no_run
/// use bitscope::{FfmpegLibrary, ScanOptions, index_many_parallel};
///
/// let paths = ["a.mkv", "b.mkv"];
/// for (path, result) in index_many_parallel(&FfmpegLibrary, &paths, &ScanOptions::new()) {
///     match result {
///         Ok(index) => println!("{}: {} seek points", path.display(), index.len()),
///         Err(error) => eprintln!("{}: {error}", path.display()),
///     }
/// }
/// ```
pub fn index_many_parallel<P: AsRef<Path> + Sync>(
    library: &dyn DemuxLibrary,
    paths: &[P],
    options: &ScanOptions,
) -> Vec<(PathBuf, Result<SeekIndex, BitscopeError>)> {
    paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = if options.is_cancelled() {
                Err(BitscopeError::Cancelled)
            } else {
                PacketDemuxer::open(library, path, None, Some(options))
                    .map(|demuxer| demuxer.seek_index().clone())
            };
            (path.to_path_buf(), result)
        })
        .collect()
}
