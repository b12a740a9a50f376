//! # bitscope
//!
//! Demultiplex compressed video into access units and build the indexes a
//! player needs for random access.
//!
//! `bitscope` opens a container or elementary stream through a pluggable
//! demux library (FFmpeg via [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! by default), walks its packets once to record every key frame, and splits
//! packets into NAL units or OBUs whichever way the stream packs them. Per-block
//! coding statistics stored next to a bitstream are indexed in the background
//! and parsed one frame at a time.
//!
//! ## Quick Start
//!
//! ### Index a bitstream
//!
//! ```no_run
//! use bitscope::{BitscopeError, FfmpegLibrary, PacketDemuxer, ScanOptions};
//!
//! let demuxer = PacketDemuxer::open(&FfmpegLibrary, "input.mkv", None, Some(&ScanOptions::new()))?;
//! println!("{} frames, {} seek points", demuxer.frame_count(), demuxer.seek_index().len());
//! if let Some(point) = demuxer.closest_seekable_frame_at_or_before(120) {
//!     println!("Decode frame 120 starting at frame {}", point.frame_index);
//! }
//! # Ok::<(), BitscopeError>(())
//! ```
//!
//! ### Walk access units
//!
//! ```no_run
//! use bitscope::{BitscopeError, FfmpegLibrary, PacketDemuxer};
//!
//! let mut demuxer = PacketDemuxer::open(&FfmpegLibrary, "input.mp4", None, None)?;
//! for parameter_set in demuxer.parameter_sets()? {
//!     println!("parameter set: {} bytes", parameter_set.len());
//! }
//! while let Some(unit) = demuxer.next_unit(false) {
//!     println!("unit: {} bytes", unit.len());
//! }
//! # Ok::<(), BitscopeError>(())
//! ```
//!
//! ### Read coding statistics
//!
//! ```no_run
//! use bitscope::{BitscopeError, StatisticsFile};
//!
//! let mut stats = StatisticsFile::open("decoder_stats.csv")?;
//! stats.wait();
//! let data = stats.load_statistic_data(0, 1);
//! println!("{} blocks in frame 0", data.len());
//! # Ok::<(), BitscopeError>(())
//! ```
//!
//! ## Features
//!
//! - **Access-unit extraction**: Annex-B start codes, length-prefixed NAL
//!   units, and AV1 OBUs, with format sniffing from the first packet
//! - **Parameter sets**: SPS/PPS/VPS out of `hvcC` and `avcC` extradata
//! - **Random-access index**: one-pass key-frame scan with progress and
//!   cancellation, shared between readers of the same file
//! - **Statistics files**: CSV and VTM-BMS formats, background offset scan,
//!   per-frame loading
//! - **Buffered file access** with optional change watching
//! - **File-name hints**: frame size, rate, and bit depth from raw file names
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `async` | `index_async` scans on a Tokio blocking thread |
//! | `rayon` | `index_many_parallel` scans many files across rayon threads |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod access_unit;
pub mod backend;
pub mod background;
pub mod bit_reader;
pub mod buffered_file;
pub mod configuration;
pub mod demuxer;
pub mod error;
pub mod ffmpeg;
pub mod ffmpeg_input;
pub mod filename;
pub mod keyframe;
pub mod line_reader;
pub mod metadata;
pub mod packet;
pub mod parameter_sets;
pub mod progress;
#[cfg(feature = "rayon")]
mod rayon;
pub mod statistics;
#[cfg(feature = "async")]
pub mod stream;
pub mod validation;

pub use access_unit::{AccessUnit, AccessUnitFormat, ObuHeader, UnitExtractor, split_packet};
pub use backend::{DemuxInput, DemuxLibrary, Rational, StreamInfo, StreamMedium};
pub use background::IndexTask;
pub use bit_reader::BitReader;
pub use buffered_file::{BufferedFile, ChangeNotifier};
pub use configuration::{DEFAULT_READ_CHUNK_SIZE, ScanOptions, SourceOptions};
pub use demuxer::PacketDemuxer;
pub use error::BitscopeError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use ffmpeg_input::FfmpegLibrary;
pub use filename::{FileNameFormat, absolute_path_from_abs_and_rel};
pub use keyframe::{GroupOfPicturesInfo, ScanOutcome, SeekIndex, SeekPoint};
pub use line_reader::LineReader;
pub use metadata::{ColorConversion, ColorSpaceTag, RawFormat, VideoMetadata};
pub use packet::{Packet, PacketKind};
pub use parameter_sets::{CodecFamily, extract_parameter_sets};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
#[cfg(feature = "rayon")]
pub use crate::rayon::index_many_parallel;
pub use statistics::{
    FrameTypeData, OffsetIndex, ScanState, StatisticsEvent, StatisticsFile, StatisticsFormat,
    StatisticsHeader, StatisticsInfo, StatisticsType,
};
#[cfg(feature = "async")]
pub use stream::{SeekIndexFuture, index_async};
pub use validation::ValidationReport;
