//! The frame/type to byte-offset index built by a background scan.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{buffered_file::BufferedFile, error::BitscopeError};

/// Lines longer than this are dropped while scanning.
pub(crate) const MAX_LINE_LENGTH: usize = 1 << 28;

/// Life cycle of a background statistics scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning,
    Completed,
    Cancelled,
    Errored,
}

impl ScanState {
    /// `Completed`, `Cancelled`, and `Errored` stay put until a reload.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Cancelled | ScanState::Errored
        )
    }
}

impl Display for ScanState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let text = match self {
            ScanState::Idle => "idle",
            ScanState::Scanning => "scanning",
            ScanState::Completed => "completed",
            ScanState::Cancelled => "cancelled",
            ScanState::Errored => "errored",
        };
        f.write_str(text)
    }
}

/// What a scanner learned from one line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LineOutcome {
    /// A newly recorded frame, with its type when the format has one.
    pub(crate) available: Option<(i32, Option<i32>)>,
    /// The line started a different frame than the one before it.
    pub(crate) frame_changed: bool,
}

impl LineOutcome {
    pub(crate) fn available(frame: i32, type_id: Option<i32>) -> Self {
        Self {
            available: Some((frame, type_id)),
            frame_changed: false,
        }
    }
}

/// Byte offsets of the first line of each frame, and of each (frame, type)
/// pair when the file format records types separately.
///
/// Every recorded offset is correct on its own, so a partially built index
/// is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    per_type: BTreeMap<i32, BTreeMap<i32, u64>>,
    frame_starts: BTreeMap<i32, u64>,
    sorted_by_frame: bool,
    max_frame: Option<i32>,
}

impl OffsetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the first line of `type_id` in `frame`.
    ///
    /// Returns `false` without changing anything if the pair is already
    /// known.
    pub fn record(&mut self, frame: i32, type_id: i32, offset: u64) -> bool {
        let types = self.per_type.entry(frame).or_default();
        if types.contains_key(&type_id) {
            return false;
        }
        types.insert(type_id, offset);
        self.frame_starts
            .entry(frame)
            .and_modify(|start| *start = (*start).min(offset))
            .or_insert(offset);
        self.update_max_frame(frame);
        true
    }

    /// Record where the lines of `frame` begin. A later call for the same
    /// frame replaces the offset.
    pub fn record_frame(&mut self, frame: i32, offset: u64) {
        self.frame_starts.insert(frame, offset);
        self.update_max_frame(frame);
    }

    fn update_max_frame(&mut self, frame: i32) {
        self.max_frame = Some(self.max_frame.map_or(frame, |max| max.max(frame)));
    }

    /// Offset recorded for one (frame, type) pair.
    pub fn offset(&self, frame: i32, type_id: i32) -> Option<u64> {
        self.per_type.get(&frame)?.get(&type_id).copied()
    }

    /// Smallest offset recorded for `frame`.
    pub fn frame_start(&self, frame: i32) -> Option<u64> {
        self.frame_starts.get(&frame).copied()
    }

    pub fn contains_frame(&self, frame: i32) -> bool {
        self.frame_starts.contains_key(&frame)
    }

    /// Type ids recorded for `frame`, ascending.
    pub fn types_in_frame(&self, frame: i32) -> Vec<i32> {
        self.per_type
            .get(&frame)
            .map(|types| types.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Indexed frames, ascending.
    pub fn frames(&self) -> impl Iterator<Item = i32> + '_ {
        self.frame_starts.keys().copied()
    }

    /// Number of indexed frames.
    pub fn frame_count(&self) -> usize {
        self.frame_starts.len()
    }

    /// Number of (frame, type) offsets.
    pub fn len(&self) -> usize {
        self.per_type.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_starts.is_empty()
    }

    pub fn max_frame(&self) -> Option<i32> {
        self.max_frame
    }

    /// Whether the file groups every type of a frame together.
    pub fn is_sorted_by_frame(&self) -> bool {
        self.sorted_by_frame
    }

    pub(crate) fn set_sorted_by_frame(&mut self, sorted: bool) {
        self.sorted_by_frame = sorted;
    }
}

/// Walk `file` in `chunk_size` pieces and hand every non-empty line to
/// `on_line` with the byte offset it starts at.
///
/// `is_cancelled` is consulted before each refill, so a line that straddles
/// two chunks is always finished first. Returns `Ok(false)` when cancelled.
pub(crate) fn scan_lines<C, F>(
    file: &BufferedFile,
    chunk_size: usize,
    is_cancelled: C,
    mut on_line: F,
) -> Result<bool, BitscopeError>
where
    C: Fn() -> bool,
    F: FnMut(u64, &[u8]) -> Result<(), BitscopeError>,
{
    let chunk_size = chunk_size.max(1);
    let mut buffer = Vec::with_capacity(chunk_size);
    let mut buffer_start = 0u64;
    let mut line: Vec<u8> = Vec::new();
    let mut line_start = 0u64;

    loop {
        if is_cancelled() {
            return Ok(false);
        }
        let read = file.read_bytes(&mut buffer, buffer_start, chunk_size);

        if line.len() > MAX_LINE_LENGTH {
            log::warn!(
                "Dropping {} byte line at offset {line_start} without a line feed",
                line.len()
            );
            line.clear();
        }

        let mut rest = &buffer[..read];
        let mut consumed = 0usize;
        while let Some(newline) = rest.iter().position(|&byte| byte == b'\n') {
            line.extend_from_slice(&rest[..newline]);
            if !line.is_empty() {
                on_line(line_start, &line)?;
            }
            line.clear();
            consumed += newline + 1;
            line_start = buffer_start + consumed as u64;
            rest = &rest[newline + 1..];
        }
        line.extend_from_slice(rest);

        buffer_start += read as u64;
        if read < chunk_size {
            break;
        }
    }

    if !line.is_empty() {
        on_line(line_start, &line)?;
    }
    Ok(true)
}
