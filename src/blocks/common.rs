use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::MdfError;

/// Byte order declared by the identification block.
///
/// MDF 3.x stores every multi-byte field of the metadata blocks, and the
/// default-ordered signal types 0 to 3, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        }
    }

    pub fn read_i16(self, bytes: &[u8]) -> i16 {
        match self {
            Endian::Little => LittleEndian::read_i16(bytes),
            Endian::Big => BigEndian::read_i16(bytes),
        }
    }

    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        }
    }

    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(bytes),
            Endian::Big => BigEndian::read_u64(bytes),
        }
    }

    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        match self {
            Endian::Little => LittleEndian::read_f32(bytes),
            Endian::Big => BigEndian::read_f32(bytes),
        }
    }

    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        match self {
            Endian::Little => LittleEndian::read_f64(bytes),
            Endian::Big => BigEndian::read_f64(bytes),
        }
    }

    /// Reads an unsigned integer of 1..=8 bytes.
    pub fn read_uint(self, bytes: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_uint(bytes, bytes.len()),
            Endian::Big => BigEndian::read_uint(bytes, bytes.len()),
        }
    }

    /// Reads a sign-extended integer of 1..=8 bytes.
    pub fn read_int(self, bytes: &[u8]) -> i64 {
        match self {
            Endian::Little => LittleEndian::read_int(bytes, bytes.len()),
            Endian::Big => BigEndian::read_int(bytes, bytes.len()),
        }
    }
}

/// Common 4-byte header of all MDF 3.x blocks: two ASCII identifier
/// characters followed by the block length.
#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub id: String,
    pub block_len: u16,
}

impl BlockHeader {
    pub fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, MdfError> {
        if bytes.len() < 4 {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: 4,
                file:     file!(),
                line:     line!(),
            });
        }
        Ok(Self {
            id: String::from_utf8_lossy(&bytes[0..2]).to_string(),
            block_len: endian.read_u16(&bytes[2..4]),
        })
    }

    /// Serialized header; output files are always little-endian.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        if self.id.len() != 2 {
            return Err(MdfError::BlockSerializationError(format!(
                "block identifier must be 2 characters, found '{}'",
                self.id
            )));
        }
        let mut buffer = Vec::with_capacity(4);
        buffer.extend_from_slice(self.id.as_bytes());
        buffer.extend_from_slice(&self.block_len.to_le_bytes());
        Ok(buffer)
    }
}

pub trait BlockParse: Sized {
    const ID: &'static str;

    fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, MdfError>;

    fn parse_header(bytes: &[u8], endian: Endian) -> Result<BlockHeader, MdfError> {
        let header = BlockHeader::from_bytes(bytes, endian)?;
        if header.id != Self::ID {
            return Err(MdfError::BlockIDError {
                actual:   header.id,
                expected: Self::ID.to_string(),
            });
        }
        Ok(header)
    }
}

/// Decodes a latin1 buffer, stopping at the first NUL terminator.
pub fn latin1_to_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

/// Encodes `value` the way the 3.x fixed-size character fields expect it:
/// truncated or NUL-padded to `size` bytes plus a terminating NUL, so the
/// output is always `size + 1` bytes long.
pub fn latin1_fixed(value: &str, size: usize) -> Vec<u8> {
    let mut buffer: Vec<u8> = value
        .chars()
        .take(size)
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect();
    buffer.resize(size, 0);
    buffer.push(0);
    buffer
}

/// Encodes `value` as raw latin1 without padding or terminator.
pub fn latin1_exact(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Resolves a TXBlock link to its text, `None` for NIL links.
pub fn read_string_block(
    file_data: &[u8],
    addr: u32,
    endian: Endian,
) -> Result<Option<String>, MdfError> {
    if addr == 0 {
        return Ok(None);
    }
    let offset = addr as usize;
    if offset + 4 > file_data.len() {
        return Err(MdfError::TooShortBuffer {
            actual:   file_data.len(),
            expected: offset + 4,
            file:     file!(),
            line:     line!(),
        });
    }
    let text_block = super::text_block::TextBlock::from_bytes(&file_data[offset..], endian)?;
    Ok(Some(text_block.text))
}
