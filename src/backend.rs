//! Capability traits for the demux library.
//!
//! [`PacketDemuxer`](crate::PacketDemuxer) never talks to a global library
//! handle. It is given a [`DemuxLibrary`] by reference, opens a
//! [`DemuxInput`] through it, and pulls packets and stream metadata from that
//! input. [`FfmpegLibrary`](crate::FfmpegLibrary) is the production
//! implementation; tests substitute an in-memory one.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use crate::{
    error::BitscopeError, metadata::ColorSpaceTag, packet::Packet,
    parameter_sets::CodecFamily,
};

/// Time base used by [`DemuxInput::duration`] (microseconds).
pub const DURATION_TIME_BASE: i64 = 1_000_000;

/// A rational number as reported by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator.
    pub num: i32,
    /// Denominator.
    pub den: i32,
}

impl Rational {
    /// Create a rational.
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Value as `f64`, or `None` if the denominator is zero.
    pub fn to_f64(self) -> Option<f64> {
        if self.den == 0 {
            None
        } else {
            Some(f64::from(self.num) / f64::from(self.den))
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Media type of a container stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamMedium {
    /// Video.
    Video,
    /// Audio.
    Audio,
    /// Subtitles or captions.
    Subtitle,
    /// Opaque data.
    Data,
    /// Attachments (fonts, cover art).
    Attachment,
    /// Anything the library did not classify.
    #[default]
    Unknown,
}

impl Display for StreamMedium {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            StreamMedium::Video => "video",
            StreamMedium::Audio => "audio",
            StreamMedium::Subtitle => "subtitle",
            StreamMedium::Data => "data",
            StreamMedium::Attachment => "attachment",
            StreamMedium::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Description of one container stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    /// Index of the stream in the container.
    pub index: usize,
    /// Media type.
    pub medium: StreamMedium,
    /// Codec name as reported by the library (e.g. `"hevc"`, `"dvb_subtitle"`).
    pub codec_name: String,
    /// Frame width (video only).
    pub width: u32,
    /// Frame height (video only).
    pub height: u32,
    /// Average frame rate (video only).
    pub frame_rate: Rational,
    /// Time base of the stream's timestamps.
    pub time_base: Rational,
    /// Pixel format name (video only).
    pub pixel_format: Option<String>,
    /// Colour-space tag (video only).
    pub color_space: ColorSpaceTag,
    /// Codec extradata (configuration record).
    pub extradata: Vec<u8>,
}

impl StreamInfo {
    /// Codec family derived from the codec name.
    pub fn codec_family(&self) -> CodecFamily {
        CodecFamily::from_codec_name(&self.codec_name)
    }

    /// Short human-readable description: `"<medium> <codec> (WxH)"`.
    pub fn description(&self) -> String {
        format!(
            "{} {} ({}x{})",
            self.medium, self.codec_name, self.width, self.height
        )
    }
}

/// Entry point into a demux library.
pub trait DemuxLibrary: Send + Sync {
    /// Library name for diagnostics.
    fn name(&self) -> &str;

    /// Open a container for reading.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::FileOpen`] or [`BitscopeError::Demux`] if the
    /// library cannot open or probe the input.
    fn open_input(&self, path: &Path) -> Result<Box<dyn DemuxInput>, BitscopeError>;
}

/// An opened container.
pub trait DemuxInput: Send {
    /// All streams in container order.
    fn streams(&self) -> &[StreamInfo];

    /// Container duration in [`DURATION_TIME_BASE`] units, `0` if unknown.
    fn duration(&self) -> i64;

    /// Container-level metadata tags.
    fn metadata(&self) -> Vec<(String, String)>;

    /// Read the next packet into `packet`, overwriting its contents.
    /// `packet.kind` is left for the caller to set.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::EndOfStream`] when no packets remain.
    fn read_packet(&mut self, packet: &mut Packet) -> Result<(), BitscopeError>;

    /// Seek so the next packet read is the key frame at or before `dts` in
    /// `stream_index`.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::Seek`] if the library rejects the seek.
    fn seek_to_dts(&mut self, stream_index: usize, dts: i64) -> Result<(), BitscopeError>;

    /// Seek back to the first packet.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::Seek`] if the library rejects the seek.
    fn seek_to_start(&mut self) -> Result<(), BitscopeError>;
}
