//! Statistic type descriptions read from file headers.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

/// How scalar values are turned into colors.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ColorMapper {
    /// No mapping declared.
    #[default]
    None,
    /// Discrete value-to-color table.
    Map(BTreeMap<i32, Color>),
    /// Linear gradient between two explicit colors.
    Gradient {
        min: i32,
        max: i32,
        min_color: Color,
        max_color: Color,
    },
    /// Linear gradient over a named palette such as `jet`.
    Named { name: String, min: i32, max: i32 },
}

impl ColorMapper {
    /// Value range covered by the mapper, if it has one.
    pub fn range(&self) -> Option<(i32, i32)> {
        match self {
            ColorMapper::None => None,
            ColorMapper::Map(map) => {
                let min = map.keys().next()?;
                let max = map.keys().next_back()?;
                Some((*min, *max))
            }
            ColorMapper::Gradient { min, max, .. } | ColorMapper::Named { min, max, .. } => {
                Some((*min, *max))
            }
        }
    }
}

/// Marker drawn at the tip of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ArrowHead {
    #[default]
    Arrow,
    Circle,
    None,
}

/// One kind of per-block annotation declared in a statistics file header.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsType {
    /// Numeric identifier. Rows reference their type by this id.
    pub id: i32,
    pub name: String,
    /// Free-form text following the kind in a VTM-BMS declaration.
    pub description: String,
    pub has_value_data: bool,
    pub has_vector_data: bool,
    pub has_affine_data: bool,
    /// Regions are polygons rather than axis-aligned blocks.
    pub is_polygon: bool,
    pub render_value_data: bool,
    pub render_vector_data: bool,
    /// Scale values by block area when rendering.
    pub scale_to_block_size: bool,
    pub color_mapper: ColorMapper,
    pub vector_color: Color,
    pub grid_color: Color,
    /// Vector components are divided by this before display.
    pub vector_scale: i32,
    pub arrow_head: ArrowHead,
}

impl StatisticsType {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            has_value_data: false,
            has_vector_data: false,
            has_affine_data: false,
            is_polygon: false,
            render_value_data: false,
            render_vector_data: false,
            scale_to_block_size: false,
            color_mapper: ColorMapper::None,
            vector_color: Color::BLACK,
            grid_color: Color::BLACK,
            vector_scale: 1,
            arrow_head: ArrowHead::Arrow,
        }
    }

    /// Short label for the kind of data rows of this type carry.
    pub fn kind(&self) -> &'static str {
        match (
            self.has_value_data,
            self.has_vector_data,
            self.has_affine_data,
        ) {
            (_, _, true) => "affine",
            (true, true, _) => "value+vector",
            (true, false, _) => "value",
            (false, true, _) if self.arrow_head == ArrowHead::None => "line",
            (false, true, _) => "vector",
            _ => "none",
        }
    }
}

/// Everything declared in a statistics file header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsHeader {
    /// Frame width and height, if declared.
    pub frame_size: Option<(u32, u32)>,
    /// Frames per second, if declared.
    pub frame_rate: Option<f64>,
    /// Sequence name from a CSV `seq-specs` line.
    pub sequence_name: Option<String>,
    types: Vec<StatisticsType>,
}

impl StatisticsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared types in header order.
    pub fn types(&self) -> &[StatisticsType] {
        &self.types
    }

    pub fn type_by_id(&self, id: i32) -> Option<&StatisticsType> {
        self.types.iter().find(|ty| ty.id == id)
    }

    pub fn type_by_name(&self, name: &str) -> Option<&StatisticsType> {
        self.types.iter().find(|ty| ty.name == name)
    }

    /// Add a type with an explicit id. A type already using that id is
    /// replaced.
    pub fn add_type(&mut self, statistics_type: StatisticsType) {
        match self
            .types
            .iter_mut()
            .find(|existing| existing.id == statistics_type.id)
        {
            Some(existing) => *existing = statistics_type,
            None => self.types.push(statistics_type),
        }
    }

    /// Add a type that carries no id of its own.
    ///
    /// Skipped if a type with the same name exists. Otherwise it gets one
    /// more than the largest id in use (ids start at 1). Returns the id.
    pub fn add_type_auto_id(&mut self, mut statistics_type: StatisticsType) -> i32 {
        if let Some(existing) = self.type_by_name(&statistics_type.name) {
            return existing.id;
        }
        let max_id = self.types.iter().map(|ty| ty.id).max().unwrap_or(0).max(0);
        statistics_type.id = max_id + 1;
        let id = statistics_type.id;
        self.types.push(statistics_type);
        id
    }
}
