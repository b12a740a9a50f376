//! In-memory demux library shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use bitscope::{
    BitscopeError, ColorSpaceTag, DemuxInput, DemuxLibrary, Packet, Rational, StreamInfo,
    StreamMedium,
};

/// A demux library that serves a fixed list of packets for any path.
#[derive(Clone, Default)]
pub struct FakeLibrary {
    pub streams: Vec<StreamInfo>,
    pub packets: Vec<Packet>,
    /// Container duration in microseconds.
    pub duration: i64,
    pub metadata: Vec<(String, String)>,
    reads: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl FakeLibrary {
    pub fn new(streams: Vec<StreamInfo>, packets: Vec<Packet>) -> Self {
        Self {
            streams,
            packets,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }

    /// Packets handed out so far, across every opened input.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DemuxLibrary for FakeLibrary {
    fn name(&self) -> &str {
        "fake"
    }

    fn open_input(&self, _path: &Path) -> Result<Box<dyn DemuxInput>, BitscopeError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeInput {
            library: self.clone(),
            position: 0,
        }))
    }
}

struct FakeInput {
    library: FakeLibrary,
    position: usize,
}

impl DemuxInput for FakeInput {
    fn streams(&self) -> &[StreamInfo] {
        &self.library.streams
    }

    fn duration(&self) -> i64 {
        self.library.duration
    }

    fn metadata(&self) -> Vec<(String, String)> {
        self.library.metadata.clone()
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<(), BitscopeError> {
        let next = self
            .library
            .packets
            .get(self.position)
            .ok_or(BitscopeError::EndOfStream)?;
        packet.data.clear();
        packet.data.extend_from_slice(&next.data);
        packet.pts = next.pts;
        packet.dts = next.dts;
        packet.is_keyframe = next.is_keyframe;
        packet.stream_index = next.stream_index;
        self.position += 1;
        self.library.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn seek_to_dts(&mut self, stream_index: usize, dts: i64) -> Result<(), BitscopeError> {
        self.position = self
            .library
            .packets
            .iter()
            .enumerate()
            .filter(|(_, packet)| {
                packet.stream_index == stream_index
                    && packet.is_keyframe
                    && packet.dts.is_some_and(|packet_dts| packet_dts <= dts)
            })
            .map(|(position, _)| position)
            .next_back()
            .unwrap_or(0);
        Ok(())
    }

    fn seek_to_start(&mut self) -> Result<(), BitscopeError> {
        self.position = 0;
        Ok(())
    }
}

pub fn video_stream(index: usize, codec_name: &str) -> StreamInfo {
    StreamInfo {
        index,
        medium: StreamMedium::Video,
        codec_name: codec_name.to_string(),
        width: 1920,
        height: 1080,
        frame_rate: Rational::new(25, 1),
        time_base: Rational::new(1, 1000),
        pixel_format: Some("yuv420p".to_string()),
        color_space: ColorSpaceTag::Bt709,
        extradata: Vec::new(),
    }
}

pub fn audio_stream(index: usize) -> StreamInfo {
    StreamInfo {
        index,
        medium: StreamMedium::Audio,
        codec_name: "aac".to_string(),
        time_base: Rational::new(1, 48000),
        ..StreamInfo::default()
    }
}

pub fn subtitle_stream(index: usize, codec_name: &str) -> StreamInfo {
    StreamInfo {
        index,
        medium: StreamMedium::Subtitle,
        codec_name: codec_name.to_string(),
        ..StreamInfo::default()
    }
}

pub fn packet(stream_index: usize, dts: i64, is_keyframe: bool, data: Vec<u8>) -> Packet {
    Packet {
        data,
        pts: Some(dts),
        dts: Some(dts),
        is_keyframe,
        stream_index,
        ..Packet::default()
    }
}

/// Annex-B payload with one unit per entry of `units`.
pub fn annex_b(units: &[&[u8]]) -> Vec<u8> {
    let mut payload = Vec::new();
    for unit in units {
        payload.extend_from_slice(&[0, 0, 0, 1]);
        payload.extend_from_slice(unit);
    }
    payload
}

/// Length-prefixed payload with one unit per entry of `units`.
pub fn length_prefixed(units: &[&[u8]]) -> Vec<u8> {
    let mut payload = Vec::new();
    for unit in units {
        payload.extend_from_slice(&(unit.len() as u32).to_be_bytes());
        payload.extend_from_slice(unit);
    }
    payload
}

/// Ten video frames at 40 ms spacing with key frames at 0, 3, and 7.
/// Frame `n` carries DTS `100 + 10 * n`.
pub fn gop_packets(stream_index: usize) -> Vec<Packet> {
    (0..10)
        .map(|frame: i64| {
            packet(
                stream_index,
                100 + 10 * frame,
                matches!(frame, 0 | 3 | 7),
                annex_b(&[&[0x26, 0x01, frame as u8 + 1]]),
            )
        })
        .collect()
}

/// A real file for `PacketDemuxer::open` to stat; its content is never read.
pub fn placeholder_file() -> tempfile::NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".hevc")
        .tempfile()
        .expect("Failed to create temp file");
    std::fs::write(file.path(), b"placeholder").expect("Failed to write temp file");
    file
}
