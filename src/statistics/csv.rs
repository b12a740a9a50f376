//! Semicolon-separated statistics files.
//!
//! Header lines start with `%` and declare types, colors and sequence
//! properties:
//!
//! ```text
//! %;type;1;PredMode;map
//! %;mapColor;0;255;0;0;255
//! %;seq-specs;Kimono;0;1920;1080;24
//! ```
//!
//! Data rows hold `frame;x;y;width;height;type;value` with an optional
//! second value (vector) or three further values (line).

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::{
    buffered_file::BufferedFile,
    error::BitscopeError,
    line_reader::LineReader,
    statistics::{
        data::{Block, BlockLine, BlockValue, BlockVector, LoadedFrame},
        index::{LineOutcome, OffsetIndex},
        types::{ArrowHead, Color, ColorMapper, StatisticsHeader, StatisticsType},
    },
};

const INTERLEAVED_VIOLATION: &str =
    "The data for each POC must be continuous in an interleaved statistics file";
const SEQUENTIAL_VIOLATION: &str =
    "The data for each typeID must be continuous in an non interleaved statistics file";

/// Trim, drop every space, and split on `;`.
pub(crate) fn split_line(line: &str) -> Vec<String> {
    line.trim()
        .replace(' ', "")
        .split(';')
        .map(str::to_owned)
        .collect()
}

fn field<'a>(fields: &'a [String], index: usize, offset: u64) -> Result<&'a str, BitscopeError> {
    fields
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| BitscopeError::StatisticsParse {
            offset,
            message: format!("missing field {index}"),
        })
}

fn number(fields: &[String], index: usize, offset: u64) -> Result<i32, BitscopeError> {
    let text = field(fields, index, offset)?;
    text.parse().map_err(|_| BitscopeError::StatisticsParse {
        offset,
        message: format!("field {index} is not a number: {text:?}"),
    })
}

fn channel(fields: &[String], index: usize, offset: u64) -> Result<u8, BitscopeError> {
    Ok(number(fields, index, offset)?.clamp(0, 255) as u8)
}

/// Read the `%` header block at the start of `file` into `header`.
///
/// Stops at the first data row. On error, `header` keeps every type that
/// was complete before the offending line.
pub(crate) fn read_header(
    file: &BufferedFile,
    header: &mut StatisticsHeader,
) -> Result<(), BitscopeError> {
    let mut pending: Option<StatisticsType> = None;

    for (offset, line) in LineReader::new(file, 0) {
        let fields = split_line(&line);
        let Some(first) = fields.first().filter(|first| !first.is_empty()) else {
            continue;
        };
        let is_comment = first.starts_with('%');
        let keyword = fields.get(1).map(String::as_str).unwrap_or_default();

        // A new type or the first data row closes the open type.
        if keyword == "type" || !is_comment {
            if let Some(finished) = pending.take() {
                header.add_type(finished);
            }
        }
        if !is_comment {
            return Ok(());
        }

        match keyword {
            "type" => {
                let mut statistics_type =
                    StatisticsType::new(number(&fields, 2, offset)?, field(&fields, 3, offset)?);
                match fields.get(4).map(String::as_str) {
                    Some("map" | "range") => {
                        statistics_type.has_value_data = true;
                        statistics_type.render_value_data = true;
                    }
                    Some(kind @ ("vector" | "line")) => {
                        statistics_type.has_vector_data = true;
                        statistics_type.render_vector_data = true;
                        if kind == "line" {
                            statistics_type.arrow_head = ArrowHead::None;
                        }
                    }
                    _ => {}
                }
                pending = Some(statistics_type);
            }
            "mapColor" => {
                let value = number(&fields, 2, offset)?;
                let color = Color::rgba(
                    channel(&fields, 3, offset)?,
                    channel(&fields, 4, offset)?,
                    channel(&fields, 5, offset)?,
                    channel(&fields, 6, offset)?,
                );
                if let Some(statistics_type) = pending.as_mut() {
                    if !matches!(statistics_type.color_mapper, ColorMapper::Map(_)) {
                        statistics_type.color_mapper = ColorMapper::Map(BTreeMap::new());
                    }
                    if let ColorMapper::Map(map) = &mut statistics_type.color_mapper {
                        map.insert(value, color);
                    }
                }
            }
            "range" => {
                // Channels alternate between the min and the max color.
                let mapper = ColorMapper::Gradient {
                    min: number(&fields, 2, offset)?,
                    max: number(&fields, 3, offset)?,
                    min_color: Color::rgba(
                        channel(&fields, 4, offset)?,
                        channel(&fields, 6, offset)?,
                        channel(&fields, 8, offset)?,
                        channel(&fields, 10, offset)?,
                    ),
                    max_color: Color::rgba(
                        channel(&fields, 5, offset)?,
                        channel(&fields, 7, offset)?,
                        channel(&fields, 9, offset)?,
                        channel(&fields, 11, offset)?,
                    ),
                };
                if let Some(statistics_type) = pending.as_mut() {
                    statistics_type.color_mapper = mapper;
                }
            }
            "defaultRange" => {
                let mapper = ColorMapper::Named {
                    min: number(&fields, 2, offset)?,
                    max: number(&fields, 3, offset)?,
                    name: field(&fields, 4, offset)?.to_owned(),
                };
                if let Some(statistics_type) = pending.as_mut() {
                    statistics_type.color_mapper = mapper;
                }
            }
            "vectorColor" => {
                let color = Color::rgba(
                    channel(&fields, 2, offset)?,
                    channel(&fields, 3, offset)?,
                    channel(&fields, 4, offset)?,
                    channel(&fields, 5, offset)?,
                );
                if let Some(statistics_type) = pending.as_mut() {
                    statistics_type.vector_color = color;
                }
            }
            "gridColor" => {
                let color = Color::rgb(
                    channel(&fields, 2, offset)?,
                    channel(&fields, 3, offset)?,
                    channel(&fields, 4, offset)?,
                );
                if let Some(statistics_type) = pending.as_mut() {
                    statistics_type.grid_color = color;
                }
            }
            "scaleFactor" => {
                let scale = number(&fields, 2, offset)?;
                if let Some(statistics_type) = pending.as_mut() {
                    statistics_type.vector_scale = scale;
                }
            }
            "scaleToBlockSize" => {
                let scale = field(&fields, 2, offset)? == "1";
                if let Some(statistics_type) = pending.as_mut() {
                    statistics_type.scale_to_block_size = scale;
                }
            }
            "seq-specs" => {
                header.sequence_name = Some(field(&fields, 2, offset)?.to_owned());
                let width = number(&fields, 4, offset)?;
                let height = number(&fields, 5, offset)?;
                if width > 0 && height > 0 {
                    header.frame_size = Some((width as u32, height as u32));
                }
                let rate_text = field(&fields, 6, offset)?;
                let rate: f64 = rate_text.parse().map_err(|_| BitscopeError::StatisticsParse {
                    offset,
                    message: format!("invalid frame rate {rate_text:?}"),
                })?;
                if rate > 0.0 {
                    header.frame_rate = Some(rate);
                }
            }
            _ => {}
        }
    }

    if let Some(finished) = pending {
        header.add_type(finished);
    }
    Ok(())
}

/// Incremental state of a background scan over CSV rows.
#[derive(Debug, Default)]
pub(crate) struct CsvScanner {
    last: Option<(i32, i32)>,
    sorting_fixed: bool,
}

impl CsvScanner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Index one line.
    ///
    /// The first change of type within a frame marks the file as sorted by
    /// frame; the first change of frame fixes the sorting either way.
    pub(crate) fn process_line(
        &mut self,
        offset: u64,
        line: &[u8],
        index: &Mutex<OffsetIndex>,
    ) -> Result<LineOutcome, BitscopeError> {
        let fields = split_line(&String::from_utf8_lossy(line));
        match fields.first() {
            Some(first) if !first.is_empty() && !first.starts_with('%') => {}
            _ => return Ok(LineOutcome::default()),
        }
        let frame = number(&fields, 0, offset)?;
        let type_id = number(&fields, 5, offset)?;

        let Some((last_frame, last_type)) = self.last else {
            index.lock().record(frame, type_id, offset);
            self.last = Some((frame, type_id));
            return Ok(LineOutcome::available(frame, Some(type_id)));
        };

        if frame == last_frame && type_id != last_type {
            let mut index = index.lock();
            if !self.sorting_fixed {
                index.set_sorted_by_frame(true);
                self.sorting_fixed = true;
            }
            self.last = Some((frame, type_id));
            if index.record(frame, type_id, offset) {
                return Ok(LineOutcome::available(frame, Some(type_id)));
            }
            Ok(LineOutcome::default())
        } else if frame != last_frame {
            self.sorting_fixed = true;
            let mut index = index.lock();
            if index.is_sorted_by_frame() {
                if index.contains_frame(frame) {
                    return Err(BitscopeError::StatisticsStructure(
                        INTERLEAVED_VIOLATION.to_string(),
                    ));
                }
            } else if index.offset(frame, type_id).is_some() {
                return Err(BitscopeError::StatisticsStructure(
                    SEQUENTIAL_VIOLATION.to_string(),
                ));
            }
            index.record(frame, type_id, offset);
            self.last = Some((frame, type_id));
            Ok(LineOutcome {
                available: Some((frame, Some(type_id))),
                frame_changed: true,
            })
        } else {
            Ok(LineOutcome::default())
        }
    }
}

/// Parse the rows of `frame` starting at `start`.
///
/// Sorted-by-frame files are read until the frame changes and may yield
/// several types; otherwise reading also stops when the type changes.
pub(crate) fn load_frame(
    file: &BufferedFile,
    header: &StatisticsHeader,
    start: u64,
    sorted_by_frame: bool,
    frame: i32,
    type_id: i32,
) -> LoadedFrame {
    let mut loaded = LoadedFrame::default();

    for (offset, line) in LineReader::new(file, start) {
        let fields = split_line(&line);
        match fields.first() {
            Some(first) if !first.is_empty() && !first.starts_with('%') => {}
            _ => continue,
        }
        let row = match parse_row(&fields, offset) {
            Ok(row) => row,
            Err(error) => {
                loaded.error.get_or_insert_with(|| error.to_string());
                continue;
            }
        };
        if row.frame != frame || (!sorted_by_frame && row.type_id != type_id) {
            break;
        }

        if header
            .frame_size
            .is_some_and(|size| row.block.exceeds(size))
        {
            loaded.outside_frame = true;
        }

        let has_vector_data = header
            .type_by_id(row.type_id)
            .is_some_and(|statistics_type| statistics_type.has_vector_data);
        let data = loaded.data.entry(row.type_id).or_default();
        match (has_vector_data, row.values.as_slice()) {
            (true, [x0, y0, x1, y1, ..]) => data.lines.push(BlockLine {
                block: row.block,
                start: (*x0, *y0),
                end: (*x1, *y1),
            }),
            (true, [x, y, ..]) => data.vectors.push(BlockVector {
                block: row.block,
                x: *x,
                y: *y,
            }),
            (_, [value, ..]) => data.values.push(BlockValue {
                block: row.block,
                value: *value,
            }),
            _ => {}
        }
    }
    loaded
}

struct Row {
    frame: i32,
    type_id: i32,
    block: Block,
    values: Vec<i32>,
}

fn parse_row(fields: &[String], offset: u64) -> Result<Row, BitscopeError> {
    let block = Block::new(
        number(fields, 1, offset)?,
        number(fields, 2, offset)?,
        number(fields, 3, offset)?,
        number(fields, 4, offset)?,
    );
    let used = fields
        .iter()
        .rposition(|field| !field.is_empty())
        .map_or(0, |last| last + 1);
    // One value, a vector, or a line with two end points.
    let value_count = match used {
        n if n >= 10 => 4,
        n if n >= 8 => 2,
        _ => 1,
    };
    let values = (6..6 + value_count)
        .map(|index| number(fields, index, offset))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row {
        frame: number(fields, 0, offset)?,
        type_id: number(fields, 5, offset)?,
        block,
        values,
    })
}
