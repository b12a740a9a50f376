//! Demuxer validation.
//!
//! Provides [`PacketDemuxer::validate`](crate::PacketDemuxer::validate) which
//! inspects an opened stream and returns a [`ValidationReport`] describing its
//! structure and any potential issues.
//!
//! # Example
//!
//! ```no_run
//! use bitscope::{FfmpegLibrary, PacketDemuxer, ScanOptions};
//!
//! let demuxer = PacketDemuxer::open(&FfmpegLibrary, "input.mp4", None, Some(&ScanOptions::new()))?;
//! let report = demuxer.validate();
//! if report.is_valid() {
//!     println!("Stream is seekable");
//! } else {
//!     for error in &report.errors {
//!         println!("Error: {error}");
//!     }
//! }
//! # Ok::<(), bitscope::BitscopeError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{
    access_unit::AccessUnitFormat, backend::StreamInfo, keyframe::SeekIndex,
    metadata::VideoMetadata,
};

/// Summary of demuxer validation.
///
/// Contains lists of informational notices, warnings, and errors.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Informational notices (not problems).
    pub info: Vec<String>,
    /// Non-fatal issues that may affect unit extraction or seeking.
    pub warnings: Vec<String>,
    /// Issues that prevent random access.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` if no errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of issues (info + warnings + errors).
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len() + self.errors.len()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        for item in &self.errors {
            writeln!(f, "[ERROR] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "No issues found.")?;
        }
        Ok(())
    }
}

pub(crate) fn validate_stream(
    metadata: &VideoMetadata,
    streams: &[StreamInfo],
    format: Option<AccessUnitFormat>,
    index: &SeekIndex,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    // Video stream
    if metadata.width == 0 || metadata.height == 0 {
        report.warnings.push(format!(
            "Frame size is unknown: {}x{}",
            metadata.width, metadata.height,
        ));
    }
    match metadata.frame_rate {
        None => report
            .warnings
            .push("Frame rate is unknown (zero denominator)".to_string()),
        Some(rate) if rate <= 0.0 => report
            .warnings
            .push(format!("Frame rate is not positive ({rate:.2})")),
        Some(_) => {}
    }
    report.info.push(format!(
        "Video: {} {}x{} @ {}, {}",
        metadata.codec,
        metadata.width,
        metadata.height,
        metadata
            .frame_rate
            .map_or_else(|| "unknown fps".to_string(), |rate| format!("{rate:.2} fps")),
        metadata.color_conversion,
    ));

    // Access units
    match format {
        Some(format) => report.info.push(format!("Access units: {format}")),
        None => report.warnings.push(
            "Access-unit format not detected yet; unit extraction will return nothing".to_string(),
        ),
    }

    // Seek index
    match index.points().first() {
        None => report
            .errors
            .push("No seek points recorded; random access is unavailable".to_string()),
        Some(first) => {
            if first.frame_index != 0 {
                report.warnings.push(format!(
                    "First seek point is at frame {}; earlier frames are not decodable",
                    first.frame_index,
                ));
            }
            report.info.push(format!(
                "{} seek points over {} frames",
                index.len(),
                index.frame_count(),
            ));
        }
    }

    let others = streams.len().saturating_sub(1);
    if others > 0 {
        report
            .info
            .push(format!("{others} other stream(s) present"));
    }

    report
}
