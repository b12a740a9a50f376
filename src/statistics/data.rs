//! Per-frame annotation data loaded on demand.

use std::collections::BTreeMap;

/// An axis-aligned block in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Block {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Block {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the block extends past a frame of the given size.
    pub fn exceeds(&self, frame_size: (u32, u32)) -> bool {
        i64::from(self.x) + i64::from(self.width) > i64::from(frame_size.0)
            || i64::from(self.y) + i64::from(self.height) > i64::from(frame_size.1)
    }
}

/// A block carrying one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockValue {
    pub block: Block,
    pub value: i32,
}

/// A block carrying a two-component vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockVector {
    pub block: Block,
    pub x: i32,
    pub y: i32,
}

/// A block carrying a line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLine {
    pub block: Block,
    pub start: (i32, i32),
    pub end: (i32, i32),
}

/// A block carrying three control-point vectors of an affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAffine {
    pub block: Block,
    pub points: [(i32, i32); 3],
}

/// A polygon carrying one scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolygonValue {
    pub corners: Vec<(i32, i32)>,
    pub value: i32,
}

/// A polygon carrying a two-component vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolygonVector {
    pub corners: Vec<(i32, i32)>,
    pub x: i32,
    pub y: i32,
}

/// All regions of one type in one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameTypeData {
    pub values: Vec<BlockValue>,
    pub vectors: Vec<BlockVector>,
    pub lines: Vec<BlockLine>,
    pub affine: Vec<BlockAffine>,
    pub polygon_values: Vec<PolygonValue>,
    pub polygon_vectors: Vec<PolygonVector>,
}

impl FrameTypeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of regions of every shape.
    pub fn len(&self) -> usize {
        self.values.len()
            + self.vectors.len()
            + self.lines.len()
            + self.affine.len()
            + self.polygon_values.len()
            + self.polygon_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of re-parsing one frame.
#[derive(Debug, Default)]
pub(crate) struct LoadedFrame {
    pub(crate) data: BTreeMap<i32, FrameTypeData>,
    /// Some region reached past the declared frame size.
    pub(crate) outside_frame: bool,
    /// First line that could not be parsed.
    pub(crate) error: Option<String>,
}
