//! Packet demultiplexing over a [`DemuxLibrary`].
//!
//! [`PacketDemuxer`] opens a container through a demux library, picks the
//! video stream, and serves packets (optionally video only) from a single
//! reused [`Packet`] slot. Video packets can be further split into access
//! units with [`PacketDemuxer::next_unit`].
//!
//! # Example
//!
//! ```no_run
//! use bitscope::{BitscopeError, FfmpegLibrary, PacketDemuxer, ScanOptions};
//!
//! let library = FfmpegLibrary;
//! let mut demuxer = PacketDemuxer::open(&library, "input.mkv", None, Some(&ScanOptions::new()))?;
//!
//! // A second reader shares the first one's index instead of rescanning.
//! let mut second = PacketDemuxer::open(&library, "input.mkv", Some(&demuxer), None)?;
//! assert_eq!(second.frame_count(), demuxer.frame_count());
//!
//! if let Some(point) = demuxer.closest_seekable_frame_at_or_before(100) {
//!     demuxer.seek_to_dts(point.dts)?;
//! }
//! while let Some(packet) = demuxer.next_packet(false, true) {
//!     println!("{} bytes, dts {:?}", packet.size(), packet.dts);
//! }
//! # Ok::<(), BitscopeError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    access_unit::{AccessUnitFormat, UnitExtractor},
    backend::{DURATION_TIME_BASE, DemuxInput, DemuxLibrary, Rational, StreamInfo, StreamMedium},
    configuration::ScanOptions,
    error::BitscopeError,
    keyframe::{self, ScanOutcome, SeekIndex, SeekPoint},
    metadata::VideoMetadata,
    packet::{Packet, PacketKind},
    parameter_sets::extract_parameter_sets,
    validation::{self, ValidationReport},
};

/// Demultiplexer over one opened container.
///
/// Each instance owns its own library context. A second reader of the same
/// file opens its own `PacketDemuxer`, optionally seeded with the first
/// one's [`SeekIndex`].
pub struct PacketDemuxer {
    path: PathBuf,
    input: Option<Box<dyn DemuxInput>>,
    streams: Vec<StreamInfo>,
    video_stream: usize,
    metadata: VideoMetadata,
    duration: i64,
    packet: Packet,
    end_of_file: bool,
    extractor: UnitExtractor,
    seek_index: SeekIndex,
}

impl std::fmt::Debug for PacketDemuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketDemuxer")
            .field("path", &self.path)
            .field("is_open", &self.is_open())
            .field("video_stream", &self.video_stream)
            .field("frame_count", &self.seek_index.frame_count())
            .finish_non_exhaustive()
    }
}

impl PacketDemuxer {
    /// Open `path` through `library`.
    ///
    /// If `reference` is given and open, its frame count and seek index are
    /// copied. Otherwise, if `scan` is given, the whole video stream is
    /// scanned for seek points and the demuxer is rewound to the start.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::FileOpen`] / [`BitscopeError::NotAFile`] for
    /// bad paths, [`BitscopeError::NoVideoStream`] if the container has no
    /// video stream, and [`BitscopeError::Cancelled`] if the scan was
    /// cancelled.
    pub fn open<P: AsRef<Path>>(
        library: &dyn DemuxLibrary,
        path: P,
        reference: Option<&PacketDemuxer>,
        scan: Option<&ScanOptions>,
    ) -> Result<Self, BitscopeError> {
        let path = path.as_ref();
        log::debug!("Opening {} with {}", path.display(), library.name());

        let file_metadata = fs::metadata(path).map_err(|error| BitscopeError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        if !file_metadata.is_file() {
            return Err(BitscopeError::NotAFile(path.to_path_buf()));
        }

        let input = library.open_input(path)?;
        let streams = input.streams().to_vec();
        let video = streams
            .iter()
            .rev()
            .find(|stream| stream.medium == StreamMedium::Video)
            .ok_or(BitscopeError::NoVideoStream)?;
        let video_stream = video.index;
        let metadata = VideoMetadata::from_stream(video);
        let duration = input.duration();

        let mut demuxer = Self {
            path: path.to_path_buf(),
            input: Some(input),
            streams,
            video_stream,
            metadata,
            duration,
            packet: Packet::empty(),
            end_of_file: false,
            extractor: UnitExtractor::new(None),
            seek_index: SeekIndex::new(),
        };

        match (reference, scan) {
            (Some(reference), _) if reference.is_open() => {
                log::debug!(
                    "Reusing seek index of {} ({} frames)",
                    reference.path.display(),
                    reference.frame_count()
                );
                demuxer.seek_index = reference.seek_index.clone();
            }
            (_, Some(options)) => {
                if demuxer.scan(options)? == ScanOutcome::Cancelled {
                    return Err(BitscopeError::Cancelled);
                }
            }
            _ => {}
        }
        Ok(demuxer)
    }

    /// Rewind, scan every video packet, and replace the seek index.
    ///
    /// On [`ScanOutcome::Completed`] the demuxer is rewound to the start. On
    /// [`ScanOutcome::Cancelled`] the partial index is kept for inspection
    /// but must not be used for seeking.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::NotOpen`] if the demuxer is not usable, or a
    /// seek error if rewinding fails.
    pub fn scan(&mut self, options: &ScanOptions) -> Result<ScanOutcome, BitscopeError> {
        if !self.is_open() {
            return Err(BitscopeError::NotOpen);
        }
        self.seek_index = SeekIndex::new();
        self.seek_to_start()?;
        let (index, outcome) = keyframe::scan_seek_points(self, options);
        self.seek_index = index;
        if outcome == ScanOutcome::Completed {
            self.seek_to_start()?;
        }
        Ok(outcome)
    }

    /// Re-open the same path, discarding the current index, and rescan if
    /// `scan` is given.
    ///
    /// On failure the demuxer is left closed.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn reload(
        &mut self,
        library: &dyn DemuxLibrary,
        scan: Option<&ScanOptions>,
    ) -> Result<(), BitscopeError> {
        log::debug!("Reloading {}", self.path.display());
        let path = self.path.clone();
        self.input = None;
        self.end_of_file = false;
        self.seek_index = SeekIndex::new();
        self.extractor = UnitExtractor::new(None);
        self.packet.unref();
        *self = Self::open(library, path, None, scan)?;
        Ok(())
    }

    /// Whether the demuxer holds an open library context.
    pub fn is_open(&self) -> bool {
        self.input.is_some()
    }

    /// The path this demuxer was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container index of the video stream.
    pub fn video_stream_index(&self) -> usize {
        self.video_stream
    }

    /// Metadata of the video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// All container streams.
    pub fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    /// Container-level metadata tags.
    pub fn container_metadata(&self) -> Vec<(String, String)> {
        self.input
            .as_ref()
            .map(|input| input.metadata())
            .unwrap_or_default()
    }

    /// One line per stream: `"<medium> <codec> (WxH)"`.
    pub fn stream_descriptions(&self) -> Vec<String> {
        self.streams.iter().map(StreamInfo::description).collect()
    }

    /// Time base of every stream, in container order.
    pub fn time_bases(&self) -> Vec<Rational> {
        self.streams.iter().map(|stream| stream.time_base).collect()
    }

    /// Time base of the video stream.
    pub fn video_time_base(&self) -> Rational {
        self.video_info()
            .map(|stream| stream.time_base)
            .unwrap_or_default()
    }

    /// Container duration expressed in the video stream's time base, `0`
    /// when either is unknown.
    pub fn max_ts(&self) -> i64 {
        let time_base = self.video_time_base();
        if time_base.num == 0 {
            return 0;
        }
        let scaled = i128::from(self.duration) * i128::from(time_base.den)
            / (i128::from(DURATION_TIME_BASE) * i128::from(time_base.num));
        i64::try_from(scaled).unwrap_or(i64::MAX)
    }

    /// Codec extradata of the video stream.
    pub fn extradata(&self) -> &[u8] {
        self.video_info()
            .map(|stream| stream.extradata.as_slice())
            .unwrap_or_default()
    }

    /// Parameter-set units (VPS/SPS/PPS) held in the video stream's extradata.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::MalformedExtradata`] for truncated records.
    pub fn parameter_sets(&self) -> Result<Vec<Vec<u8>>, BitscopeError> {
        match self.video_info() {
            Some(stream) => extract_parameter_sets(stream.codec_family(), &stream.extradata),
            None => Ok(Vec::new()),
        }
    }

    /// Access-unit convention, once guessed from the first video packet.
    pub fn access_unit_format(&self) -> Option<AccessUnitFormat> {
        self.extractor.format()
    }

    /// The seek index built by the last scan (or copied from a reference).
    pub fn seek_index(&self) -> &SeekIndex {
        &self.seek_index
    }

    /// Number of video frames seen by the scan.
    pub fn frame_count(&self) -> u64 {
        self.seek_index.frame_count()
    }

    /// `(first decodable frame, frame count)`, if the stream was scanned.
    pub fn decodable_frame_limits(&self) -> Option<(u64, u64)> {
        self.seek_index.decodable_frame_limits()
    }

    /// The last seek point at or before `frame_index`.
    pub fn closest_seekable_frame_at_or_before(&self, frame_index: u64) -> Option<SeekPoint> {
        self.seek_index.closest_at_or_before(frame_index)
    }

    /// Whether the library reported the end of the input.
    pub fn is_at_end(&self) -> bool {
        self.end_of_file
    }

    /// Return the next packet, or the current one again if `again` is set.
    ///
    /// With `video_only`, packets of other streams are skipped. Returns
    /// `None` and sets [`is_at_end`](Self::is_at_end) once the library has no
    /// more packets. The returned packet is overwritten by the next call.
    pub fn next_packet(&mut self, again: bool, video_only: bool) -> Option<&Packet> {
        if again {
            return Some(&self.packet);
        }
        if self.read_packet(video_only) {
            Some(&self.packet)
        } else {
            None
        }
    }

    /// Return the next access unit of the video stream, pulling new packets
    /// as needed. With `again`, the previously returned unit is returned
    /// unchanged.
    ///
    /// Returns `None` at end of stream and for a packet whose bytes do not
    /// follow the detected convention; that packet is dropped and the next
    /// call continues with the following one.
    pub fn next_unit(&mut self, again: bool) -> Option<&[u8]> {
        if again {
            return self
                .extractor
                .last_span()
                .map(|_| self.extractor.last_unit());
        }

        while self.extractor.is_drained() {
            if !self.read_packet(true) {
                return None;
            }
            self.extractor.load_packet(&self.packet.data);
        }

        self.extractor.advance()?;
        Some(self.extractor.last_unit())
    }

    /// Seek so the next video packet is the key frame at or before `dts`.
    ///
    /// Clears the end-of-file flag and any partially consumed packet.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::NotOpen`] or the library's seek error.
    pub fn seek_to_dts(&mut self, dts: i64) -> Result<(), BitscopeError> {
        let input = self.input.as_mut().ok_or(BitscopeError::NotOpen)?;
        log::debug!("Seeking stream {} to DTS {dts}", self.video_stream);
        input.seek_to_dts(self.video_stream, dts)?;
        self.after_seek();
        Ok(())
    }

    /// Seek back to the first packet.
    ///
    /// # Errors
    ///
    /// Returns [`BitscopeError::NotOpen`] or the library's seek error.
    pub fn seek_to_start(&mut self) -> Result<(), BitscopeError> {
        let input = self.input.as_mut().ok_or(BitscopeError::NotOpen)?;
        input.seek_to_start()?;
        self.after_seek();
        Ok(())
    }

    /// Check the opened stream for conditions that limit unit extraction or
    /// random access.
    pub fn validate(&self) -> ValidationReport {
        validation::validate_stream(
            &self.metadata,
            &self.streams,
            self.extractor.format(),
            &self.seek_index,
        )
    }

    fn after_seek(&mut self) {
        self.end_of_file = false;
        self.packet.unref();
        self.extractor.clear();
    }

    fn video_info(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|stream| stream.index == self.video_stream)
    }

    fn classify(&self, stream_index: usize) -> PacketKind {
        if stream_index == self.video_stream {
            return PacketKind::Video;
        }
        let Some(stream) = self.streams.iter().find(|stream| stream.index == stream_index) else {
            return PacketKind::Other;
        };
        match stream.medium {
            StreamMedium::Audio => PacketKind::Audio,
            StreamMedium::Subtitle => match stream.codec_name.as_str() {
                "dvb_subtitle" => PacketKind::SubtitleDvb,
                "eia_608" => PacketKind::Subtitle608,
                _ => PacketKind::SubtitleOther,
            },
            _ => PacketKind::Other,
        }
    }

    fn read_packet(&mut self, video_only: bool) -> bool {
        loop {
            let Some(input) = self.input.as_mut() else {
                return false;
            };
            self.packet.unref();
            match input.read_packet(&mut self.packet) {
                Ok(()) => {}
                Err(BitscopeError::EndOfStream) => {
                    log::debug!("End of {}", self.path.display());
                    self.end_of_file = true;
                    self.packet.unref();
                    return false;
                }
                Err(error) => {
                    log::warn!("Reading {} failed: {error}", self.path.display());
                    self.end_of_file = true;
                    self.packet.unref();
                    return false;
                }
            }

            let kind = self.classify(self.packet.stream_index);
            self.packet.kind = kind;
            if kind == PacketKind::Video && self.extractor.format().is_none() {
                let guess = AccessUnitFormat::guess(&self.packet.data);
                match guess {
                    Some(format) => log::debug!("Access units look like {format}"),
                    None => log::debug!("Could not recognise the access-unit format"),
                }
                self.extractor.set_format(guess);
            }

            if !video_only || kind == PacketKind::Video {
                return true;
            }
        }
    }
}
