//! Random-access indexing and Group of Pictures analysis.
//!
//! A one-pass scan over the video packets of a [`PacketDemuxer`] records a
//! [`SeekPoint`] for every key frame. The resulting [`SeekIndex`] answers
//! "where can decoding restart for frame N" and summarises the Group of
//! Pictures structure without decoding anything.
//!
//! # Example
//!
//! ```no_run
//! use bitscope::{BitscopeError, FfmpegLibrary, PacketDemuxer, ScanOptions};
//!
//! let demuxer = PacketDemuxer::open(&FfmpegLibrary, "input.mp4", None, Some(&ScanOptions::new()))?;
//! let group_of_pictures = demuxer.seek_index().group_of_pictures();
//! println!("Seek points: {}", demuxer.seek_index().len());
//! println!("Average Group of Pictures size: {:.1}", group_of_pictures.average_group_of_pictures_size);
//! if let Some(point) = demuxer.closest_seekable_frame_at_or_before(250) {
//!     println!("Frame 250 decodes from frame {} (DTS {})", point.frame_index, point.dts);
//! }
//! # Ok::<(), BitscopeError>(())
//! ```

use crate::{
    configuration::ScanOptions,
    demuxer::PacketDemuxer,
    progress::{OperationType, PercentTracker},
};

/// A decode restart position: a key frame's index and decode timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekPoint {
    /// Index of the frame among all video packets, in decode order.
    pub frame_index: u64,
    /// Decode timestamp of the frame, in the video stream's time base.
    pub dts: i64,
}

/// How a bitstream scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanOutcome {
    /// Every packet was visited; the index is complete.
    Completed,
    /// The scan stopped on request. The partial index must not be used for
    /// playback.
    Cancelled,
}

/// Ordered list of seek points plus the total number of video frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeekIndex {
    points: Vec<SeekPoint>,
    frame_count: u64,
}

impl SeekIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from already known parts. `points` must be ascending.
    pub fn from_parts(points: Vec<SeekPoint>, frame_count: u64) -> Self {
        Self {
            points,
            frame_count,
        }
    }

    /// All seek points in ascending frame order.
    pub fn points(&self) -> &[SeekPoint] {
        &self.points
    }

    /// Number of seek points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no seek point is recorded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of video frames seen by the scan.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The last seek point whose frame index is `<= frame_index`.
    ///
    /// The first seek point is returned for any frame before it. `None` only
    /// when the index is empty.
    pub fn closest_at_or_before(&self, frame_index: u64) -> Option<SeekPoint> {
        let mut best = *self.points.first()?;
        for point in &self.points {
            if point.frame_index > frame_index {
                break;
            }
            best = *point;
        }
        Some(best)
    }

    /// Range of frames a decoder can produce: first seek point to frame count.
    pub fn decodable_frame_limits(&self) -> Option<(u64, u64)> {
        self.points
            .first()
            .map(|point| (point.frame_index, self.frame_count))
    }

    /// Summarise the distances between seek points.
    pub fn group_of_pictures(&self) -> GroupOfPicturesInfo {
        let group_of_pictures_sizes: Vec<u64> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let end = self
                    .points
                    .get(i + 1)
                    .map_or(self.frame_count, |next| next.frame_index);
                end.saturating_sub(point.frame_index)
            })
            .collect();

        let average_group_of_pictures_size = if group_of_pictures_sizes.is_empty() {
            0.0
        } else {
            group_of_pictures_sizes.iter().sum::<u64>() as f64
                / group_of_pictures_sizes.len() as f64
        };

        GroupOfPicturesInfo {
            min_group_of_pictures_size: group_of_pictures_sizes.iter().copied().min().unwrap_or(0),
            max_group_of_pictures_size: group_of_pictures_sizes.iter().copied().max().unwrap_or(0),
            average_group_of_pictures_size,
            group_of_pictures_sizes,
            total_frames: self.frame_count,
        }
    }

    pub(crate) fn push(&mut self, point: SeekPoint) {
        self.points.push(point);
    }

    pub(crate) fn set_frame_count(&mut self, frame_count: u64) {
        self.frame_count = frame_count;
    }
}

/// Summary of the Group of Pictures structure.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOfPicturesInfo {
    /// Frames between seek point i and seek point i+1 (or the end of the
    /// stream for the last one).
    pub group_of_pictures_sizes: Vec<u64>,
    /// Average Group of Pictures size in frames.
    pub average_group_of_pictures_size: f64,
    /// Minimum Group of Pictures size observed.
    pub min_group_of_pictures_size: u64,
    /// Maximum Group of Pictures size observed.
    pub max_group_of_pictures_size: u64,
    /// Total number of video frames scanned.
    pub total_frames: u64,
}

/// Visit every remaining video packet of `demuxer` and record its key frames.
///
/// Cancellation is checked once per packet. Progress is derived from the
/// packet PTS relative to the stream's maximum timestamp.
pub(crate) fn scan_seek_points(
    demuxer: &mut PacketDemuxer,
    options: &ScanOptions,
) -> (SeekIndex, ScanOutcome) {
    let max_ts = demuxer.max_ts();
    log::debug!(
        "Scanning {} for seek points (max ts {max_ts})",
        demuxer.path().display()
    );

    let mut tracker = PercentTracker::new(
        options.progress.clone(),
        OperationType::BitstreamIndexing,
        None,
    );
    let mut index = SeekIndex::new();
    let mut frame_count: u64 = 0;
    let mut first_dts: Option<i64> = None;

    loop {
        if options.is_cancelled() {
            log::debug!("Seek point scan cancelled after {frame_count} frames");
            index.set_frame_count(frame_count);
            return (index, ScanOutcome::Cancelled);
        }

        let Some(packet) = demuxer.next_packet(false, true) else {
            break;
        };
        let dts = packet.dts.or(packet.pts).unwrap_or(0);
        first_dts.get_or_insert(dts);

        if packet.is_keyframe {
            index.push(SeekPoint {
                frame_index: frame_count,
                dts,
            });
        }

        if max_ts != 0 {
            if let Some(pts) = packet.pts {
                let percent = (i128::from(pts) * 100 / i128::from(max_ts)).clamp(0, 100);
                tracker.advance(percent as i32);
            }
        }
        frame_count += 1;
    }

    if index.is_empty() {
        if let Some(dts) = first_dts {
            log::warn!("No key frame flagged; treating the first frame as seekable");
            index.push(SeekPoint {
                frame_index: 0,
                dts,
            });
        }
    }
    index.set_frame_count(frame_count);
    tracker.finish();

    log::info!(
        "Indexed {frame_count} frames, {} seek points",
        index.len()
    );
    (index, ScanOutcome::Completed)
}
