//! Error types for the `bitscope` crate.
//!
//! This module defines [`BitscopeError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry context such as file
//! paths, byte offsets, and frame indices so callers can render a useful
//! message without extra logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `bitscope` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BitscopeError {
    /// The file could not be opened.
    #[error("Failed to open file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to `open`.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The path exists but does not name a regular file.
    #[error("Not a regular file: {0}")]
    NotAFile(PathBuf),

    /// The container does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The demuxer has not been opened (or a previous open failed).
    #[error("Demuxer is not open")]
    NotOpen,

    /// An error originating from the demux library.
    #[error("Demux library error: {0}")]
    Demux(String),

    /// The demux library reported the end of the input.
    #[error("End of stream")]
    EndOfStream,

    /// Seeking inside the container failed.
    #[error("Failed to seek to timestamp {timestamp}: {reason}")]
    Seek {
        /// Target decode timestamp (or `0` for the stream start).
        timestamp: i64,
        /// Underlying reason.
        reason: String,
    },

    /// Codec extradata did not follow the expected parameter-set layout.
    #[error("Malformed parameter-set extradata: {0}")]
    MalformedExtradata(String),

    /// A bit-level read ran past the end of its buffer.
    #[error("Bitstream read past end of buffer (needed {needed} bits, {available} left)")]
    BitstreamExhausted {
        /// Bits requested.
        needed: usize,
        /// Bits still available.
        available: usize,
    },

    /// A header field did not hold its mandated value.
    #[error("Invalid value {value} for {field}")]
    InvalidField {
        /// Name of the syntax element.
        field: &'static str,
        /// The value that was read.
        value: u64,
    },

    /// A statistics file line could not be parsed.
    #[error("Error while parsing statistics at byte {offset}: {message}")]
    StatisticsParse {
        /// Byte offset of the start of the offending line.
        offset: u64,
        /// What went wrong.
        message: String,
    },

    /// A statistics file broke the contiguity rule of its sorting mode.
    #[error("Error while parsing meta data: {0}")]
    StatisticsStructure(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,

    /// Installing or removing a file-system watch failed.
    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    /// An I/O error occurred while reading files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for BitscopeError {
    fn from(error: FfmpegError) -> Self {
        match error {
            FfmpegError::Eof => BitscopeError::EndOfStream,
            other => BitscopeError::Demux(other.to_string()),
        }
    }
}
