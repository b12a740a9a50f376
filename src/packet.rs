//! The demuxed packet slot.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Logical stream classification of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PacketKind {
    /// Packet of the video stream being indexed.
    Video,
    /// Audio packet.
    Audio,
    /// DVB subtitle packet (`dvb_subtitle`).
    SubtitleDvb,
    /// CEA/EIA-608 closed caption packet (`eia_608`).
    Subtitle608,
    /// Any other subtitle codec.
    SubtitleOther,
    /// Data, attachments, or streams that are not classified.
    #[default]
    Other,
}

impl PacketKind {
    /// Whether this is any of the subtitle kinds.
    pub fn is_subtitle(self) -> bool {
        matches!(
            self,
            PacketKind::SubtitleDvb | PacketKind::Subtitle608 | PacketKind::SubtitleOther
        )
    }
}

impl Display for PacketKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            PacketKind::Video => "video",
            PacketKind::Audio => "audio",
            PacketKind::SubtitleDvb => "subtitle (DVB)",
            PacketKind::Subtitle608 => "subtitle (608)",
            PacketKind::SubtitleOther => "subtitle",
            PacketKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// One demuxed packet.
///
/// A [`PacketDemuxer`](crate::PacketDemuxer) owns a single `Packet` and
/// overwrites it on every read, so callers that need a payload across the
/// next call must copy it out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// Presentation timestamp, in the stream's time base.
    pub pts: Option<i64>,
    /// Decode timestamp, in the stream's time base.
    pub dts: Option<i64>,
    /// Whether the packet starts a random-access point.
    pub is_keyframe: bool,
    /// Index of the stream the packet belongs to.
    pub stream_index: usize,
    /// Classification of that stream.
    pub kind: PacketKind,
}

impl Packet {
    /// An empty packet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reset the slot to empty, keeping the payload allocation.
    pub fn unref(&mut self) {
        self.data.clear();
        self.pts = None;
        self.dts = None;
        self.is_keyframe = false;
        self.stream_index = 0;
        self.kind = PacketKind::Other;
    }

    /// Whether the slot currently holds payload data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
