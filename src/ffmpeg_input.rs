//! FFmpeg-backed implementation of the demux capability traits.

use std::path::Path;

use ffmpeg_next::{
    Packet as FfmpegPacket,
    codec::context::Context as CodecContext,
    format::context::Input,
    media::Type,
    util::color::Space,
};

use crate::{
    backend::{DemuxInput, DemuxLibrary, Rational, StreamInfo, StreamMedium},
    error::BitscopeError,
    metadata::ColorSpaceTag,
    packet::Packet,
};

/// The FFmpeg demux library.
///
/// # Example
///
/// ```no_run
/// use bitscope::{BitscopeError, FfmpegLibrary, PacketDemuxer};
///
/// let mut demuxer = PacketDemuxer::open(&FfmpegLibrary, "clip.mkv", None, None)?;
/// while let Some(unit) = demuxer.next_unit(false) {
///     println!("{} byte unit", unit.len());
/// }
/// # Ok::<(), BitscopeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegLibrary;

impl DemuxLibrary for FfmpegLibrary {
    fn name(&self) -> &str {
        "FFmpeg"
    }

    fn open_input(&self, path: &Path) -> Result<Box<dyn DemuxInput>, BitscopeError> {
        // Safe to call multiple times.
        ffmpeg_next::init().map_err(|error| BitscopeError::FileOpen {
            path: path.to_path_buf(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| BitscopeError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let streams = input.streams().map(|stream| describe_stream(&stream)).collect();
        log::debug!(
            "FFmpeg opened {} ({} format)",
            path.display(),
            input.format().name()
        );

        Ok(Box::new(FfmpegInput {
            input,
            streams,
            packet: FfmpegPacket::empty(),
        }))
    }
}

/// An open FFmpeg format context.
struct FfmpegInput {
    input: Input,
    streams: Vec<StreamInfo>,
    packet: FfmpegPacket,
}

impl DemuxInput for FfmpegInput {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn duration(&self) -> i64 {
        self.input.duration().max(0)
    }

    fn metadata(&self) -> Vec<(String, String)> {
        self.input
            .metadata()
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<(), BitscopeError> {
        // Dropping the previous packet unrefs it.
        self.packet = FfmpegPacket::empty();
        self.packet.read(&mut self.input)?;

        packet.data.clear();
        if let Some(data) = self.packet.data() {
            packet.data.extend_from_slice(data);
        }
        packet.pts = self.packet.pts();
        packet.dts = self.packet.dts();
        packet.is_keyframe = self.packet.is_key();
        packet.stream_index = self.packet.stream();
        Ok(())
    }

    fn seek_to_dts(&mut self, stream_index: usize, dts: i64) -> Result<(), BitscopeError> {
        let stream = i32::try_from(stream_index).map_err(|_| BitscopeError::Seek {
            timestamp: dts,
            reason: format!("stream index {stream_index} out of range"),
        })?;
        let result = unsafe {
            ffmpeg_sys_next::av_seek_frame(
                self.input.as_mut_ptr(),
                stream,
                dts,
                ffmpeg_sys_next::AVSEEK_FLAG_BACKWARD as i32,
            )
        };
        if result < 0 {
            return Err(BitscopeError::Seek {
                timestamp: dts,
                reason: ffmpeg_next::Error::from(result).to_string(),
            });
        }
        Ok(())
    }

    fn seek_to_start(&mut self) -> Result<(), BitscopeError> {
        self.input
            .seek(0, ..0)
            .map_err(|error| BitscopeError::Seek {
                timestamp: 0,
                reason: error.to_string(),
            })
    }
}

fn describe_stream(stream: &ffmpeg_next::Stream<'_>) -> StreamInfo {
    let parameters = stream.parameters();
    let medium = match parameters.medium() {
        Type::Video => StreamMedium::Video,
        Type::Audio => StreamMedium::Audio,
        Type::Subtitle => StreamMedium::Subtitle,
        Type::Data => StreamMedium::Data,
        Type::Attachment => StreamMedium::Attachment,
        Type::Unknown => StreamMedium::Unknown,
    };
    let codec_name = parameters.id().name().to_string();

    let extradata = {
        let raw = unsafe { &*parameters.as_ptr() };
        if raw.extradata.is_null() || raw.extradata_size <= 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(raw.extradata, raw.extradata_size as usize) }
                .to_vec()
        }
    };

    let frame_rate = stream.avg_frame_rate();
    let time_base = stream.time_base();
    let mut info = StreamInfo {
        index: stream.index(),
        medium,
        codec_name,
        frame_rate: Rational::new(frame_rate.numerator(), frame_rate.denominator()),
        time_base: Rational::new(time_base.numerator(), time_base.denominator()),
        extradata,
        ..StreamInfo::default()
    };

    if medium == StreamMedium::Video {
        let decoder = CodecContext::from_parameters(parameters)
            .and_then(|context| context.decoder().video());
        match decoder {
            Ok(decoder) => {
                info.width = decoder.width();
                info.height = decoder.height();
                info.pixel_format = decoder
                    .format()
                    .descriptor()
                    .map(|descriptor| descriptor.name().to_string());
                info.color_space = color_space_tag(decoder.color_space());
            }
            Err(error) => log::warn!(
                "Could not read video parameters of stream {}: {error}",
                stream.index()
            ),
        }
    }
    info
}

fn color_space_tag(space: Space) -> ColorSpaceTag {
    match space {
        Space::BT2020NCL => ColorSpaceTag::Bt2020Ncl,
        Space::BT2020CL => ColorSpaceTag::Bt2020Cl,
        Space::BT470BG => ColorSpaceTag::Bt470Bg,
        Space::SMPTE170M => ColorSpaceTag::Smpte170M,
        Space::BT709 => ColorSpaceTag::Bt709,
        _ => ColorSpaceTag::Other,
    }
}
