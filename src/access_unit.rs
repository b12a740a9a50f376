//! Splitting demuxed packets into access units.
//!
//! A packet handed out by the demux library holds one or more access units
//! (NAL units or OBUs) in one of three byte conventions, described by
//! [`AccessUnitFormat`]. [`UnitExtractor`] keeps a private copy of the
//! current packet and a cursor into it, and hands out one unit per call to
//! [`UnitExtractor::advance`].
//!
//! # Example
//!
//! ```
//! use bitscope::{AccessUnitFormat, UnitExtractor};
//!
//! let payload = [0, 0, 0, 1, 0x40, 0x01, 0, 0, 1, 0x42, 0x01];
//! let mut extractor = UnitExtractor::new(Some(AccessUnitFormat::StartCode));
//! extractor.load_packet(&payload);
//!
//! extractor.advance().unwrap();
//! assert_eq!(extractor.last_unit(), &[0x40, 0x01]);
//! extractor.advance().unwrap();
//! assert_eq!(extractor.last_unit(), &[0x42, 0x01]);
//! assert!(extractor.is_drained());
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::Range;

use crate::{bit_reader::BitReader, error::BitscopeError};

const START_CODE: [u8; 3] = [0, 0, 1];
const START_CODE_LONG: [u8; 4] = [0, 0, 0, 1];

/// Byte convention used to delimit access units inside a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessUnitFormat {
    /// Annex-B: every unit is preceded by `00 00 01` or `00 00 00 01`.
    StartCode,
    /// ISO/IEC 14496-15: every unit is preceded by a 4-byte big-endian length.
    LengthPrefixed,
    /// AV1 open bitstream units, self-delimited by their headers.
    Obu,
}

impl Display for AccessUnitFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            AccessUnitFormat::StartCode => "Annex-B start codes",
            AccessUnitFormat::LengthPrefixed => "length-prefixed",
            AccessUnitFormat::Obu => "OBU",
        };
        f.write_str(name)
    }
}

impl AccessUnitFormat {
    /// Best-effort guess of the convention used by `data`.
    ///
    /// Tried in order: 4-byte start code, a length-prefixed walk that fits
    /// the buffer exactly, an OBU header walk, 3-byte start code.
    pub fn guess(data: &[u8]) -> Option<AccessUnitFormat> {
        if data.len() < 4 {
            return None;
        }
        if data.len() > 4 && data.starts_with(&START_CODE_LONG) {
            Some(AccessUnitFormat::StartCode)
        } else if looks_length_prefixed(data) {
            Some(AccessUnitFormat::LengthPrefixed)
        } else if looks_like_obus(data) {
            Some(AccessUnitFormat::Obu)
        } else if data.len() > 3 && data.starts_with(&START_CODE) {
            Some(AccessUnitFormat::StartCode)
        } else {
            None
        }
    }
}

fn looks_length_prefixed(data: &[u8]) -> bool {
    let mut position = 0usize;
    while position + 4 <= data.len() {
        let size = read_u32_be(&data[position..]) as usize;
        position += 4;
        if size > data.len() - position {
            return false;
        }
        position += size;
    }
    true
}

fn looks_like_obus(data: &[u8]) -> bool {
    let mut position = 0usize;
    while position + 2 <= data.len() {
        let Ok(header) = ObuHeader::parse(data, position) else {
            return false;
        };
        if header.obu_type == 0 || (9..=14).contains(&header.obu_type) {
            return false;
        }
        let remaining = (data.len() - position) as u64;
        let total = match header.obu_size {
            Some(size) => size.saturating_add(header.header_bytes as u64),
            None => remaining,
        };
        position = position.saturating_add(usize::try_from(total).unwrap_or(usize::MAX));
    }
    true
}

fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn find_start_code(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(START_CODE.len())
        .position(|window| window == START_CODE)
        .map(|position| from + position)
}

/// A parsed OBU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObuHeader {
    /// `obu_type` (4 bits).
    pub obu_type: u8,
    /// Temporal and spatial layer ids, present when the extension flag is set.
    pub extension: Option<(u8, u8)>,
    /// Payload size from the LEB128 size field, if present.
    pub obu_size: Option<u64>,
    /// Bytes consumed by the header, including the size field.
    pub header_bytes: usize,
}

impl ObuHeader {
    /// Parse the OBU header starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails when the buffer ends inside the header, the forbidden bit is
    /// set, the reserved bit is not `1`, or the extension's reserved bits are
    /// not zero.
    pub fn parse(data: &[u8], offset: usize) -> Result<ObuHeader, BitscopeError> {
        let mut reader = BitReader::new(data, offset);
        reader.read_bits_expect(1, 0, "obu_forbidden_bit")?;
        let obu_type = reader.read_bits(4)? as u8;
        let extension_flag = reader.read_flag()?;
        let has_size_field = reader.read_flag()?;
        reader.read_bits_expect(1, 1, "obu_reserved_1bit")?;

        let extension = if extension_flag {
            let temporal_id = reader.read_bits(3)? as u8;
            let spatial_id = reader.read_bits(2)? as u8;
            reader.read_bits_expect(3, 0, "extension_header_reserved_3bits")?;
            Some((temporal_id, spatial_id))
        } else {
            None
        };

        let obu_size = if has_size_field {
            Some(reader.read_leb128()?)
        } else {
            None
        };

        Ok(ObuHeader {
            obu_type,
            extension,
            obu_size,
            header_bytes: reader.bytes_read(),
        })
    }
}

/// Byte span of one access unit inside a packet payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessUnit {
    /// Offset of the first payload byte (after any start code or length prefix).
    pub offset: usize,
    /// Length of the unit in bytes.
    pub len: usize,
}

impl AccessUnit {
    /// The span as a range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// The unit's bytes within `payload`.
    pub fn slice<'a>(&self, payload: &'a [u8]) -> &'a [u8] {
        &payload[self.range()]
    }
}

/// Cursor state for splitting one packet at a time into access units.
#[derive(Debug, Clone, Default)]
pub struct UnitExtractor {
    format: Option<AccessUnitFormat>,
    data: Vec<u8>,
    cursor: usize,
    last_unit: Vec<u8>,
    last_span: Option<AccessUnit>,
}

impl UnitExtractor {
    /// Create an extractor for the given convention. `None` means the
    /// convention is not known yet; see [`set_format`](Self::set_format).
    pub fn new(format: Option<AccessUnitFormat>) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// The convention in use.
    pub fn format(&self) -> Option<AccessUnitFormat> {
        self.format
    }

    /// Fix the convention. Has no effect once a format is set.
    pub fn set_format(&mut self, format: Option<AccessUnitFormat>) {
        if self.format.is_none() {
            self.format = format;
        }
    }

    /// Copy `payload` in as the current packet and rewind the cursor.
    pub fn load_packet(&mut self, payload: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(payload);
        self.cursor = 0;
    }

    /// Whether the current packet has been fully consumed (or discarded).
    pub fn is_drained(&self) -> bool {
        self.data.is_empty()
    }

    /// Current cursor offset into the packet.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Discard the rest of the current packet.
    pub fn clear(&mut self) {
        self.data.clear();
        self.cursor = 0;
    }

    /// Bytes of the unit most recently returned by [`advance`](Self::advance).
    pub fn last_unit(&self) -> &[u8] {
        &self.last_unit
    }

    /// Span of the unit most recently returned by [`advance`](Self::advance).
    pub fn last_span(&self) -> Option<AccessUnit> {
        self.last_span
    }

    /// Carve the next unit out of the current packet.
    ///
    /// Returns `None` when the packet is drained or malformed; a malformed
    /// packet is discarded so the next call starts on a fresh packet.
    pub fn advance(&mut self) -> Option<AccessUnit> {
        if self.data.is_empty() {
            return None;
        }
        let result = match self.format {
            Some(AccessUnitFormat::StartCode) => self.advance_start_code(),
            Some(AccessUnitFormat::LengthPrefixed) => self.advance_length_prefixed(),
            Some(AccessUnitFormat::Obu) => self.advance_obu(),
            None => None,
        };

        match result {
            Some((unit, drained)) => {
                self.last_unit.clear();
                self.last_unit.extend_from_slice(unit.slice(&self.data));
                self.last_span = Some(unit);
                if drained {
                    self.clear();
                }
                Some(unit)
            }
            None => {
                log::warn!(
                    "Discarding malformed packet data at offset {} ({} bytes)",
                    self.cursor,
                    self.data.len()
                );
                self.clear();
                None
            }
        }
    }

    fn advance_start_code(&mut self) -> Option<(AccessUnit, bool)> {
        let rest = &self.data[self.cursor..];
        let skip = if rest.starts_with(&START_CODE_LONG) {
            4
        } else if rest.starts_with(&START_CODE) {
            3
        } else {
            return None;
        };

        let unit_start = self.cursor + skip;
        match find_start_code(&self.data, self.cursor + START_CODE.len()) {
            None => Some((
                AccessUnit {
                    offset: unit_start,
                    len: self.data.len() - unit_start,
                },
                true,
            )),
            Some(next) => {
                // A zero right before the next 00 00 01 belongs to a 4-byte code.
                let end = if next > unit_start && self.data[next - 1] == 0 {
                    next - 1
                } else {
                    next
                };
                self.cursor = end;
                Some((
                    AccessUnit {
                        offset: unit_start,
                        len: end - unit_start,
                    },
                    false,
                ))
            }
        }
    }

    fn advance_length_prefixed(&mut self) -> Option<(AccessUnit, bool)> {
        let remaining = self.data.len() - self.cursor;
        if remaining < 4 {
            return None;
        }
        let size = read_u32_be(&self.data[self.cursor..]) as usize;
        if size > remaining - 4 {
            return None;
        }

        let unit = AccessUnit {
            offset: self.cursor + 4,
            len: size,
        };
        self.cursor += 4 + size;
        Some((unit, self.cursor >= self.data.len()))
    }

    fn advance_obu(&mut self) -> Option<(AccessUnit, bool)> {
        let header = ObuHeader::parse(&self.data, self.cursor).ok()?;
        let remaining = self.data.len() - self.cursor;

        let Some(size) = header.obu_size else {
            return Some((
                AccessUnit {
                    offset: self.cursor,
                    len: remaining,
                },
                true,
            ));
        };

        let complete = usize::try_from(size)
            .unwrap_or(usize::MAX)
            .saturating_add(header.header_bytes);
        let len = if complete > remaining {
            log::debug!(
                "OBU at offset {} declares {complete} bytes, only {remaining} left",
                self.cursor
            );
            remaining
        } else {
            complete
        };

        let unit = AccessUnit {
            offset: self.cursor,
            len,
        };
        self.cursor += len;
        Some((unit, self.cursor >= self.data.len()))
    }
}

/// Split a whole payload into unit spans using `format`.
///
/// Stops at the first malformed unit.
pub fn split_packet(format: AccessUnitFormat, payload: &[u8]) -> Vec<AccessUnit> {
    let mut extractor = UnitExtractor::new(Some(format));
    extractor.load_packet(payload);
    let mut units = Vec::new();
    while let Some(unit) = extractor.advance() {
        units.push(unit);
    }
    units
}
