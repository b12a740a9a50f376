//! Verbosity of FFmpeg's own console output.
//!
//! FFmpeg writes diagnostics to stderr through its own logger, independent
//! of the [`log`](https://crates.io/crates/log) facade used by this crate.
//! Scanning a damaged stream can make it very chatty, so callers usually
//! lower the level before opening files.
//!
//! # Example
//!
//! ```no_run
//! use bitscope::{BitscopeError, FfmpegLibrary, FfmpegLogLevel, PacketDemuxer};
//!
//! bitscope::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! let demuxer = PacketDemuxer::open(&FfmpegLibrary, "input.hevc", None, None)?;
//! # Ok::<(), BitscopeError>(())
//! ```

use ffmpeg_next::util::log::Level;

/// FFmpeg log level, most quiet first.
///
/// Messages below the selected severity are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FfmpegLogLevel {
    /// No output at all.
    Quiet,
    Panic,
    Fatal,
    /// Recoverable errors.
    Error,
    /// FFmpeg's default.
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

impl FfmpegLogLevel {
    /// Level used by command-line front ends: errors only, or everything up
    /// to `Info` when verbose output was requested.
    pub fn for_verbosity(verbose: bool) -> Self {
        if verbose {
            FfmpegLogLevel::Info
        } else {
            FfmpegLogLevel::Error
        }
    }
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

impl From<Level> for FfmpegLogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }
}

/// Set FFmpeg's log level. Does not touch the `log` facade.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    log::debug!("Setting FFmpeg log level to {level:?}");
    ffmpeg_next::util::log::set_level(level.into());
}

/// Current FFmpeg log level, or `None` if FFmpeg reports a value outside
/// the known set.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level().ok().map(FfmpegLogLevel::from)
}
