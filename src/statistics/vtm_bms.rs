//! Block statistics dumped by the VTM reference software.
//!
//! ```text
//! # Sequence size: [832x 480]
//! # Block Statistic Type: PredMode; Integer; [0, 4]
//! # Block Statistic Type: MVL0; Vector; Scale: 4
//! BlockStat: POC 1 @( 112,  88) [ 8x 8] PredMode=1
//! BlockStat: POC 1 @( 120,  80) [ 8x 8] MVL0={ -24,  -2}
//! ```

use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::{Captures, Regex};

use crate::{
    buffered_file::BufferedFile,
    error::BitscopeError,
    line_reader::LineReader,
    statistics::{
        data::{
            Block, BlockAffine, BlockLine, BlockValue, BlockVector, FrameTypeData, LoadedFrame,
            PolygonValue, PolygonVector,
        },
        index::{LineOutcome, OffsetIndex},
        types::{ArrowHead, Color, ColorMapper, StatisticsHeader, StatisticsType},
    },
};

const BLOCK: &str = r"POC ([0-9]+) @\( *([0-9]+), *([0-9]+)\) *\[ *([0-9]+)x *([0-9]+)\] *\w+=";
const POLYGON: &str = r"POC ([0-9]+) @\[((?:\( *[0-9]+, *[0-9]+\)--){3,5})\] *\w+=";
const NUMBER: &str = r" *([0-9\-]+)";

static POC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"BlockStat: POC ([0-9]+)").ok());
static SEQUENCE_SIZE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"# Sequence size: \[([0-9]+)x *([0-9]+)\]").ok());
static TYPE_DECLARATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"# Block Statistic Type: *([0-9a-zA-Z_]+); *([0-9a-zA-Z]+); *(.*)").ok()
});
static SCALE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"Scale: *([0-9]+)").ok());
static RANGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([0-9\-]+), *([0-9\-]+)\]").ok());
static CORNER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\( *([0-9]+), *([0-9]+)\)").ok());

static SCALAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!(r"{BLOCK}([0-9\-]+)")).ok());
static VECTOR: LazyLock<Option<Regex>> = LazyLock::new(|| braced(BLOCK, 2));
static LINE: LazyLock<Option<Regex>> = LazyLock::new(|| braced(BLOCK, 4));
static AFFINE: LazyLock<Option<Regex>> = LazyLock::new(|| braced(BLOCK, 6));
static SCALAR_POLYGON: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!(r"{POLYGON}([0-9\-]+)")).ok());
static VECTOR_POLYGON: LazyLock<Option<Regex>> = LazyLock::new(|| braced(POLYGON, 2));

/// `prefix` followed by `{a, b, ...}` with `count` signed numbers.
fn braced(prefix: &str, count: usize) -> Option<Regex> {
    let numbers = vec![NUMBER; count].join(",");
    Regex::new(&format!(r"{prefix}\{{{numbers}\}}")).ok()
}

fn captures<'t>(regex: &LazyLock<Option<Regex>>, text: &'t str) -> Option<Captures<'t>> {
    regex.as_ref()?.captures(text)
}

fn int(captures: &Captures<'_>, group: usize) -> Option<i32> {
    captures.get(group)?.as_str().parse().ok()
}

/// Frame index of a `BlockStat` line.
fn frame_of(line: &str) -> Option<Result<i32, String>> {
    let captures = captures(&POC, line)?;
    let text = captures.get(1).map_or("", |poc| poc.as_str());
    Some(
        text.parse()
            .map_err(|_| format!("invalid POC {text:?}")),
    )
}

/// Read the `#` header block at the start of `file` into `header`.
pub(crate) fn read_header(
    file: &BufferedFile,
    header: &mut StatisticsHeader,
) -> Result<(), BitscopeError> {
    for (offset, line) in LineReader::new(file, 0) {
        if !line.starts_with('#') {
            break;
        }

        if let Some(size) = captures(&SEQUENCE_SIZE, &line) {
            match (int(&size, 1), int(&size, 2)) {
                (Some(width), Some(height)) if width > 0 && height > 0 => {
                    header.frame_size = Some((width as u32, height as u32));
                }
                _ => {
                    return Err(BitscopeError::StatisticsParse {
                        offset,
                        message: format!("invalid sequence size in {line:?}"),
                    });
                }
            }
        }

        if let Some(declaration) = captures(&TYPE_DECLARATION, &line) {
            let name = declaration.get(1).map_or("", |name| name.as_str());
            let kind = declaration.get(2).map_or("", |kind| kind.as_str());
            let extra = declaration.get(3).map_or("", |extra| extra.as_str());
            header.add_type_auto_id(declared_type(name, kind, extra));
        }
    }
    Ok(())
}

fn declared_type(name: &str, kind: &str, extra: &str) -> StatisticsType {
    let mut statistics_type = StatisticsType::new(-1, name);
    statistics_type.description = extra.trim().to_owned();

    let scale = || {
        captures(&SCALE, extra)
            .and_then(|scale| int(&scale, 1))
            .unwrap_or(1)
    };

    // "AffineTFVectors" also contains "Vector".
    if kind.contains("AffineTFVectors") {
        statistics_type.has_affine_data = true;
        statistics_type.render_vector_data = true;
        statistics_type.vector_scale = scale();
        statistics_type.vector_color = Color::RED;
    } else if kind.contains("Vector") {
        statistics_type.has_vector_data = true;
        statistics_type.render_vector_data = true;
        statistics_type.vector_scale = scale();
        statistics_type.vector_color = Color::RED;
    } else if kind.contains("Flag") {
        statistics_type.has_value_data = true;
        statistics_type.render_value_data = true;
        statistics_type.color_mapper = ColorMapper::Named {
            name: "jet".to_owned(),
            min: 0,
            max: 1,
        };
    } else if kind.contains("Integer") {
        let (min, max) = captures(&RANGE, extra)
            .and_then(|range| Some((int(&range, 1)?, int(&range, 2)?)))
            .unwrap_or((0, 100));
        statistics_type.has_value_data = true;
        statistics_type.render_value_data = true;
        statistics_type.color_mapper = ColorMapper::Named {
            name: "jet".to_owned(),
            min,
            max,
        };
    } else if kind.contains("Line") {
        statistics_type.has_vector_data = true;
        statistics_type.render_vector_data = true;
        statistics_type.vector_scale = 1;
        statistics_type.arrow_head = ArrowHead::None;
        statistics_type.grid_color = Color::WHITE;
        statistics_type.vector_color = Color::WHITE;
    }

    if kind.contains("Polygon") {
        statistics_type.is_polygon = true;
    }
    statistics_type
}

/// Incremental state of a background scan over `BlockStat` lines.
///
/// Only the first line of every frame is recorded.
#[derive(Debug, Default)]
pub(crate) struct VtmBmsScanner {
    last_frame: Option<i32>,
}

impl VtmBmsScanner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn process_line(
        &mut self,
        offset: u64,
        line: &[u8],
        index: &Mutex<OffsetIndex>,
    ) -> Result<LineOutcome, BitscopeError> {
        let line = String::from_utf8_lossy(line);
        let Some(frame) = frame_of(&line) else {
            return Ok(LineOutcome::default());
        };
        let frame = frame.map_err(|message| BitscopeError::StatisticsParse { offset, message })?;

        if self.last_frame == Some(frame) {
            return Ok(LineOutcome::default());
        }
        index.lock().record_frame(frame, offset);
        self.last_frame = Some(frame);
        Ok(LineOutcome {
            available: Some((frame, None)),
            frame_changed: true,
        })
    }
}

/// Parse the lines of `frame` that belong to `type_id`, starting at `start`.
pub(crate) fn load_frame(
    file: &BufferedFile,
    header: &StatisticsHeader,
    start: u64,
    frame: i32,
    type_id: i32,
) -> LoadedFrame {
    let mut loaded = LoadedFrame::default();
    let Some(statistics_type) = header.type_by_id(type_id) else {
        return loaded;
    };
    let marker = format!(" {}=", statistics_type.name);
    let mut data = FrameTypeData::new();

    for (_, line) in LineReader::new(file, start) {
        match frame_of(&line) {
            Some(Ok(poc)) if poc == frame => {}
            Some(_) => break,
            None => continue,
        }
        if !line.contains(&marker) {
            continue;
        }

        match parse_region(statistics_type, &line, &mut data) {
            Some(blocks) => {
                if let Some(size) = header.frame_size {
                    if blocks.iter().any(|block| block.exceeds(size)) {
                        loaded.outside_frame = true;
                    }
                }
            }
            None => {
                loaded
                    .error
                    .get_or_insert_with(|| format!("Error while parsing statistic: {line}"));
            }
        }
    }

    loaded.data.insert(type_id, data);
    loaded
}

/// Append the region on `line` to `data`. Returns the blocks to check
/// against the frame size, or `None` if the line does not match the shape
/// the type declares.
fn parse_region(
    statistics_type: &StatisticsType,
    line: &str,
    data: &mut FrameTypeData,
) -> Option<Vec<Block>> {
    if statistics_type.is_polygon {
        return parse_polygon(statistics_type, line, data);
    }

    if statistics_type.has_value_data {
        let values = captures(&SCALAR, line)?;
        let block = block_of(&values)?;
        data.values.push(BlockValue {
            block,
            value: int(&values, 6)?,
        });
        Some(vec![block])
    } else if statistics_type.has_vector_data {
        if let Some(vector) = captures(&VECTOR, line) {
            let block = block_of(&vector)?;
            data.vectors.push(BlockVector {
                block,
                x: int(&vector, 6)?,
                y: int(&vector, 7)?,
            });
            return Some(vec![block]);
        }
        let segment = captures(&LINE, line)?;
        let block = block_of(&segment)?;
        data.lines.push(BlockLine {
            block,
            start: (int(&segment, 6)?, int(&segment, 7)?),
            end: (int(&segment, 8)?, int(&segment, 9)?),
        });
        Some(vec![block])
    } else if statistics_type.has_affine_data {
        let affine = captures(&AFFINE, line)?;
        let block = block_of(&affine)?;
        data.affine.push(BlockAffine {
            block,
            points: [
                (int(&affine, 6)?, int(&affine, 7)?),
                (int(&affine, 8)?, int(&affine, 9)?),
                (int(&affine, 10)?, int(&affine, 11)?),
            ],
        });
        Some(vec![block])
    } else {
        None
    }
}

fn block_of(captures: &Captures<'_>) -> Option<Block> {
    Some(Block::new(
        int(captures, 2)?,
        int(captures, 3)?,
        int(captures, 4)?,
        int(captures, 5)?,
    ))
}

fn parse_polygon(
    statistics_type: &StatisticsType,
    line: &str,
    data: &mut FrameTypeData,
) -> Option<Vec<Block>> {
    let shape = if statistics_type.has_value_data {
        captures(&SCALAR_POLYGON, line)?
    } else if statistics_type.has_vector_data {
        captures(&VECTOR_POLYGON, line)?
    } else {
        return None;
    };

    let corner_text = shape.get(2)?.as_str();
    let corner_regex = CORNER.as_ref()?;
    let corners: Vec<(i32, i32)> = corner_text
        .split("--")
        .filter_map(|corner| {
            let corner = corner_regex.captures(corner)?;
            Some((int(&corner, 1)?, int(&corner, 2)?))
        })
        .collect();

    if statistics_type.has_value_data {
        data.polygon_values.push(PolygonValue {
            corners: corners.clone(),
            value: int(&shape, 3)?,
        });
    } else {
        data.polygon_vectors.push(PolygonVector {
            corners: corners.clone(),
            x: int(&shape, 3)?,
            y: int(&shape, 4)?,
        });
    }
    Some(
        corners
            .into_iter()
            .map(|(x, y)| Block::new(x, y, 0, 0))
            .collect(),
    )
}
