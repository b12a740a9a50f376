//! Parameter-set extraction from codec extradata.
//!
//! Containers that store HEVC or AVC with length-prefixed units keep the
//! VPS/SPS/PPS in the codec configuration record (`hvcC` / `avcC`) rather
//! than in the bitstream. These helpers pull those units out so they can be
//! handed to a decoder ahead of the first access unit.

use crate::error::BitscopeError;

/// Which configuration record layout to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    /// H.265 / HEVC (`hvcC`).
    Hevc,
    /// H.264 / AVC (`avcC`).
    Avc,
    /// AV1.
    Av1,
    /// Anything else.
    Other,
}

impl CodecFamily {
    /// Classify from an FFmpeg-style codec name.
    pub fn from_codec_name(name: &str) -> Self {
        match name {
            "hevc" | "h265" => CodecFamily::Hevc,
            "h264" | "avc" => CodecFamily::Avc,
            "av1" | "libdav1d" | "libaom-av1" => CodecFamily::Av1,
            _ => CodecFamily::Other,
        }
    }
}

/// Extract parameter-set NAL units from `extradata`.
///
/// Returns an empty list for codecs without a parameter-set record or when
/// the extradata is not in configuration-record form (Annex-B extradata
/// carries its parameter sets inline).
///
/// # Errors
///
/// Returns [`BitscopeError::MalformedExtradata`] when a count or length
/// field points past the end of the buffer.
///
/// # Example
///
/// ```
/// use bitscope::{parameter_sets::extract_parameter_sets, CodecFamily};
///
/// // avcC with one 2-byte SPS and one 1-byte PPS.
/// let avcc = [1, 0x64, 0, 0x1f, 0xff, 0xe1, 0, 2, 0x67, 0x64, 1, 0, 1, 0x68];
/// let sets = extract_parameter_sets(CodecFamily::Avc, &avcc).unwrap();
/// assert_eq!(sets, vec![vec![0x67, 0x64], vec![0x68]]);
/// ```
pub fn extract_parameter_sets(
    codec: CodecFamily,
    extradata: &[u8],
) -> Result<Vec<Vec<u8>>, BitscopeError> {
    match codec {
        CodecFamily::Hevc if extradata.first() == Some(&1) => parse_hvcc(extradata),
        CodecFamily::Avc if extradata.first() == Some(&1) && extradata.len() >= 7 => {
            parse_avcc(extradata)
        }
        _ => Ok(Vec::new()),
    }
}

fn parse_hvcc(data: &[u8]) -> Result<Vec<Vec<u8>>, BitscopeError> {
    let mut cursor = Cursor::new(data);
    cursor.seek(22)?;
    let array_count = cursor.read_u8("hvcC array count")?;

    let mut units = Vec::new();
    for _ in 0..array_count {
        cursor.skip(1, "hvcC NAL unit type")?;
        let nal_count = cursor.read_u16("hvcC NAL count")?;
        for _ in 0..nal_count {
            let len = cursor.read_u16("hvcC NAL length")? as usize;
            units.push(cursor.take(len, "hvcC NAL payload")?.to_vec());
        }
    }
    Ok(units)
}

fn parse_avcc(data: &[u8]) -> Result<Vec<Vec<u8>>, BitscopeError> {
    let mut cursor = Cursor::new(data);
    cursor.seek(5)?;
    let sps_count = cursor.read_u8("avcC SPS count")? & 0x1f;

    let mut units = Vec::new();
    for _ in 0..sps_count {
        let len = cursor.read_u16("avcC SPS length")? as usize;
        units.push(cursor.take(len, "avcC SPS payload")?.to_vec());
    }

    let pps_count = cursor.read_u8("avcC PPS count")?;
    for _ in 0..pps_count {
        let len = cursor.read_u16("avcC PPS length")? as usize;
        units.push(cursor.take(len, "avcC PPS payload")?.to_vec());
    }
    Ok(units)
}

struct Cursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn seek(&mut self, position: usize) -> Result<(), BitscopeError> {
        if position > self.data.len() {
            return Err(truncated("record header", position, self.data.len()));
        }
        self.position = position;
        Ok(())
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], BitscopeError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| truncated(what, self.position + len, self.data.len()))?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn skip(&mut self, len: usize, what: &str) -> Result<(), BitscopeError> {
        self.take(len, what).map(|_| ())
    }

    fn read_u8(&mut self, what: &str) -> Result<u8, BitscopeError> {
        Ok(self.take(1, what)?[0])
    }

    fn read_u16(&mut self, what: &str) -> Result<u16, BitscopeError> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

fn truncated(what: &str, needed: usize, available: usize) -> BitscopeError {
    BitscopeError::MalformedExtradata(format!(
        "{what} needs {needed} bytes, extradata has {available}"
    ))
}
