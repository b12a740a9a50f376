//! Per-block coding statistics stored next to a bitstream.
//!
//! Encoders can dump block-level decisions (prediction modes, motion
//! vectors, partitioning lines) as text. Two layouts are supported, see
//! [`StatisticsFormat`]. Opening a [`StatisticsFile`] reads the header
//! immediately and starts a background scan that records where each frame
//! (and, for CSV, each type within a frame) begins. Loading a frame then
//! seeks straight to that offset and parses only the lines it needs.

mod csv;
pub mod data;
pub mod file;
pub mod index;
pub mod types;
mod vtm_bms;

pub use data::{
    Block, BlockAffine, BlockLine, BlockValue, BlockVector, FrameTypeData, PolygonValue,
    PolygonVector,
};
pub use file::{StatisticsEvent, StatisticsFile, StatisticsFormat, StatisticsInfo};
pub use index::{OffsetIndex, ScanState};
pub use types::{ArrowHead, Color, ColorMapper, StatisticsHeader, StatisticsType};
