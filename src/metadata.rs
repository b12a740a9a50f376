//! Video stream metadata types.
//!
//! This module defines the metadata recorded by
//! [`PacketDemuxer::open`](crate::PacketDemuxer::open) for the selected video
//! stream. Metadata is read once when the file is opened and cached for the
//! lifetime of the demuxer.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::backend::StreamInfo;

/// Colour-space tag reported by the container for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSpaceTag {
    /// ITU-R BT.2020 non-constant luminance.
    Bt2020Ncl,
    /// ITU-R BT.2020 constant luminance.
    Bt2020Cl,
    /// ITU-R BT.470 System B/G.
    Bt470Bg,
    /// SMPTE 170M.
    Smpte170M,
    /// ITU-R BT.709.
    Bt709,
    /// Unspecified or not one of the above.
    #[default]
    Other,
}

/// YUV-to-RGB conversion the stream should be displayed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorConversion {
    /// BT.709, limited range.
    #[default]
    Bt709LimitedRange,
    /// BT.601, limited range.
    Bt601LimitedRange,
    /// BT.2020, limited range.
    Bt2020LimitedRange,
}

impl ColorConversion {
    /// Classify a container colour-space tag. Unknown tags map to BT.709.
    pub fn from_color_space(tag: ColorSpaceTag) -> Self {
        match tag {
            ColorSpaceTag::Bt2020Ncl | ColorSpaceTag::Bt2020Cl => {
                ColorConversion::Bt2020LimitedRange
            }
            ColorSpaceTag::Bt470Bg | ColorSpaceTag::Smpte170M => {
                ColorConversion::Bt601LimitedRange
            }
            ColorSpaceTag::Bt709 | ColorSpaceTag::Other => ColorConversion::Bt709LimitedRange,
        }
    }
}

impl Display for ColorConversion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ColorConversion::Bt709LimitedRange => "BT.709 LimitedRange",
            ColorConversion::Bt601LimitedRange => "BT.601 LimitedRange",
            ColorConversion::Bt2020LimitedRange => "BT.2020 LimitedRange",
        };
        f.write_str(name)
    }
}

/// Raw pixel format family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RawFormat {
    /// Luma/chroma formats (`yuv420p`, `nv12`, `p010le`, ...).
    Yuv,
    /// Packed or planar RGB formats (`rgb24`, `bgra`, `gbrp`, ...).
    Rgb,
    /// No pixel format reported, or not recognised.
    #[default]
    Unknown,
}

impl RawFormat {
    /// Classify an FFmpeg pixel format name.
    pub fn from_pixel_format_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let is_rgb = ["rgb", "bgr", "gbr", "argb", "abgr"]
            .iter()
            .any(|prefix| name.starts_with(prefix));
        let is_yuv = ["yuv", "yuvj", "nv", "p0", "p2", "p4", "y2", "uyvy", "yvyu", "gray"]
            .iter()
            .any(|prefix| name.starts_with(prefix));
        if is_rgb {
            RawFormat::Rgb
        } else if is_yuv {
            RawFormat::Yuv
        } else {
            RawFormat::Unknown
        }
    }
}

/// Metadata for the selected video stream.
///
/// # Example
///
/// ```no_run
/// use bitscope::{FfmpegLibrary, PacketDemuxer};
///
/// let demuxer = PacketDemuxer::open(&FfmpegLibrary, "input.mp4", None, None).unwrap();
/// let metadata = demuxer.metadata();
/// println!("{}x{} @ {:?} fps", metadata.width, metadata.height, metadata.frame_rate);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frame rate, or `None` when the container reports a zero
    /// denominator.
    pub frame_rate: Option<f64>,
    /// Codec name (e.g. `"hevc"`, `"h264"`, `"av1"`).
    pub codec: String,
    /// Pixel format family.
    pub raw_format: RawFormat,
    /// Exact pixel format name, if reported.
    pub pixel_format: Option<String>,
    /// Conversion derived from the stream's colour-space tag.
    pub color_conversion: ColorConversion,
}

impl VideoMetadata {
    pub(crate) fn from_stream(stream: &StreamInfo) -> Self {
        let frame_rate = stream.frame_rate.to_f64();
        let raw_format = stream
            .pixel_format
            .as_deref()
            .map_or(RawFormat::Unknown, RawFormat::from_pixel_format_name);

        Self {
            width: stream.width,
            height: stream.height,
            frame_rate,
            codec: stream.codec_name.clone(),
            raw_format,
            pixel_format: stream.pixel_format.clone(),
            color_conversion: ColorConversion::from_color_space(stream.color_space),
        }
    }
}
