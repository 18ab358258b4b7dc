use crate::blocks::common::{BlockHeader, Endian, latin1_fixed, latin1_to_string, read_string_block};
use crate::error::MdfError;
use super::types::{Conversion, TextRange};

/// CCBlock: value range, physical unit and the conversion rule.
#[derive(Debug, Clone)]
pub struct ConversionBlock {
    pub header: BlockHeader,
    pub range_valid: bool,
    pub min_value: f64,
    pub max_value: f64,
    pub unit: String, // 20-byte field
    pub conversion: Conversion,
}

impl ConversionBlock {
    /// Parses a CCBlock including the type-specific parameter section.
    ///
    /// `file_data` is the whole mapped file; text range tables link out to
    /// TXBlocks that are resolved here so the result is self-contained.
    pub fn from_bytes(bytes: &[u8], endian: Endian, file_data: &[u8]) -> Result<Self, MdfError> {
        let header = BlockHeader::from_bytes(bytes, endian)?;
        if header.id != "CC" {
            return Err(MdfError::BlockIDError {
                actual:   header.id,
                expected: String::from("CC"),
            });
        }

        let expected_bytes = 46;
        if bytes.len() < expected_bytes {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: expected_bytes,
                file:     file!(),
                line:     line!(),
            });
        }

        let cc_type = endian.read_u16(&bytes[42..44]);
        let size_info = endian.read_u16(&bytes[44..46]);
        let block_end = (header.block_len as usize).clamp(46, bytes.len());
        let params = &bytes[46..block_end];
        let conversion = parse_parameters(cc_type, size_info, params, endian, file_data)?;

        Ok(Self {
            header,
            range_valid: endian.read_u16(&bytes[4..6]) != 0,
            min_value: endian.read_f64(&bytes[6..14]),
            max_value: endian.read_f64(&bytes[14..22]),
            unit: latin1_to_string(&bytes[22..42]),
            conversion,
        })
    }

    /// CCBlock for already-physical values: conversion type 65535.
    pub fn physical(range_valid: bool, min_value: f64, max_value: f64, unit: &str) -> Self {
        ConversionBlock {
            header: BlockHeader { id: String::from("CC"), block_len: 46 },
            range_valid,
            min_value,
            max_value,
            unit: unit.to_string(),
            conversion: Conversion::Identity,
        }
    }

    /// Serializes the parameterless 46-byte "no conversion" form the writer
    /// emits.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        let mut buffer = Vec::with_capacity(46);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&(self.range_valid as u16).to_le_bytes());
        buffer.extend_from_slice(&self.min_value.to_le_bytes());
        buffer.extend_from_slice(&self.max_value.to_le_bytes());
        buffer.extend_from_slice(&latin1_fixed(&self.unit, 19));
        buffer.extend_from_slice(&65535u16.to_le_bytes());
        buffer.extend_from_slice(&0u16.to_le_bytes());

        if buffer.len() != 46 {
            return Err(MdfError::BlockSerializationError(format!(
                "ConversionBlock must be exactly 46 bytes, got {}",
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}

fn read_reals<const N: usize>(params: &[u8], endian: Endian) -> Result<[f64; N], MdfError> {
    if params.len() < N * 8 {
        return Err(MdfError::TooShortBuffer {
            actual:   params.len(),
            expected: N * 8,
            file:     file!(),
            line:     line!(),
        });
    }
    let mut out = [0.0; N];
    for (i, value) in out.iter_mut().enumerate() {
        *value = endian.read_f64(&params[i * 8..i * 8 + 8]);
    }
    Ok(out)
}

fn read_pairs(params: &[u8], count: usize, endian: Endian) -> Result<Vec<(f64, f64)>, MdfError> {
    if params.len() < count * 16 {
        return Err(MdfError::TooShortBuffer {
            actual:   params.len(),
            expected: count * 16,
            file:     file!(),
            line:     line!(),
        });
    }
    let mut table = Vec::with_capacity(count);
    for i in 0..count {
        let offset = i * 16;
        table.push((
            endian.read_f64(&params[offset..offset + 8]),
            endian.read_f64(&params[offset + 8..offset + 16]),
        ));
    }
    Ok(table)
}

fn parse_parameters(
    cc_type: u16,
    size_info: u16,
    params: &[u8],
    endian: Endian,
    file_data: &[u8],
) -> Result<Conversion, MdfError> {
    match cc_type {
        0 => {
            let [p1, p2] = read_reals::<2>(params, endian)?;
            Ok(Conversion::Linear { p1, p2 })
        }
        1 => Ok(Conversion::TabInterp { table: read_pairs(params, size_info as usize, endian)? }),
        2 => Ok(Conversion::Tab { table: read_pairs(params, size_info as usize, endian)? }),
        6 => Ok(Conversion::RationalOffset { p: read_reals::<6>(params, endian)? }),
        7 => Ok(Conversion::Exp { p: read_reals::<7>(params, endian)? }),
        8 => Ok(Conversion::Log { p: read_reals::<7>(params, endian)? }),
        9 => Ok(Conversion::RationalQuadratic { p: read_reals::<6>(params, endian)? }),
        10 => Ok(Conversion::TextFormula { formula: latin1_to_string(params) }),
        12 => {
            // Each entry is lower, upper and a TXBlock link; entry 0 is the
            // default text.
            let count = size_info as usize;
            if params.len() < count * 20 {
                return Err(MdfError::TooShortBuffer {
                    actual:   params.len(),
                    expected: count * 20,
                    file:     file!(),
                    line:     line!(),
                });
            }
            let mut ranges = Vec::with_capacity(count);
            for i in 0..count {
                let offset = i * 20;
                let text_addr = endian.read_u32(&params[offset + 16..offset + 20]);
                ranges.push(TextRange {
                    lower: endian.read_f64(&params[offset..offset + 8]),
                    upper: endian.read_f64(&params[offset + 8..offset + 16]),
                    text: read_string_block(file_data, text_addr, endian)?.unwrap_or_default(),
                });
            }
            Ok(Conversion::TextRangeTable { ranges })
        }
        // 11 (text table), 65535 (1:1) and anything unknown pass through
        _ => Ok(Conversion::Identity),
    }
}
