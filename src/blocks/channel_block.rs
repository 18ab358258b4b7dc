use crate::blocks::common::{BlockHeader, BlockParse, Endian, latin1_fixed, latin1_to_string, read_string_block};
use crate::blocks::conversion::ConversionBlock;
use crate::error::MdfError;

/// CNBlock describing one channel of a channel group.
///
/// The base layout is 218 bytes; 3.30 appended the long-name and
/// display-name links and the additional byte offset for 228 bytes.
#[derive(Debug, Clone)]
pub struct ChannelBlock {
    pub header: BlockHeader,
    pub next_cn_addr: u32,
    pub conversion_addr: u32,
    pub source_addr: u32,     // CEBlock
    pub dependency_addr: u32, // CDBlock
    pub comment_addr: u32,
    pub channel_type: u16, // 0 data, 1 master
    pub short_name: String, // 32-byte field
    pub description: String, // 128-byte field
    pub start_bit: u16, // absolute bit position of the value in the record
    pub bit_count: u16,
    pub signal_data_type: u16,
    pub value_range_valid: bool,
    pub min_value: f64,
    pub max_value: f64,
    pub sampling_rate: f64,
    pub long_name_addr: u32,
    pub display_name_addr: u32,
    pub additional_byte_offset: u16,

    pub name: Option<String>,
    pub conversion: Option<ConversionBlock>,
}

impl BlockParse for ChannelBlock {
    const ID: &'static str = "CN";

    /// Parses a CNBlock. Does NOT automatically resolve the long name or
    /// the conversion block.
    fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, MdfError> {
        let header = Self::parse_header(bytes, endian)?;

        let expected_bytes = 218;
        if bytes.len() < expected_bytes {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: expected_bytes,
                file:     file!(),
                line:     line!(),
            });
        }

        let len = header.block_len as usize;
        Ok(Self {
            header,
            next_cn_addr: endian.read_u32(&bytes[4..8]),
            conversion_addr: endian.read_u32(&bytes[8..12]),
            source_addr: endian.read_u32(&bytes[12..16]),
            dependency_addr: endian.read_u32(&bytes[16..20]),
            comment_addr: endian.read_u32(&bytes[20..24]),
            channel_type: endian.read_u16(&bytes[24..26]),
            short_name: latin1_to_string(&bytes[26..58]),
            description: latin1_to_string(&bytes[58..186]),
            start_bit: endian.read_u16(&bytes[186..188]),
            bit_count: endian.read_u16(&bytes[188..190]),
            signal_data_type: endian.read_u16(&bytes[190..192]),
            value_range_valid: endian.read_u16(&bytes[192..194]) != 0,
            min_value: endian.read_f64(&bytes[194..202]),
            max_value: endian.read_f64(&bytes[202..210]),
            sampling_rate: endian.read_f64(&bytes[210..218]),
            long_name_addr: if len >= 222 && bytes.len() >= 222 {
                endian.read_u32(&bytes[218..222])
            } else {
                0
            },
            display_name_addr: if len >= 226 && bytes.len() >= 226 {
                endian.read_u32(&bytes[222..226])
            } else {
                0
            },
            additional_byte_offset: if len >= 228 && bytes.len() >= 228 {
                endian.read_u16(&bytes[226..228])
            } else {
                0
            },
            name: None,
            conversion: None,
        })
    }
}

impl ChannelBlock {
    pub fn default() -> Self {
        ChannelBlock {
            header: BlockHeader { id: String::from("CN"), block_len: 228 },
            next_cn_addr: 0,
            conversion_addr: 0,
            source_addr: 0,
            dependency_addr: 0,
            comment_addr: 0,
            channel_type: 0,
            short_name: String::new(),
            description: String::new(),
            start_bit: 0,
            bit_count: 0,
            signal_data_type: 0,
            value_range_valid: false,
            min_value: 0.0,
            max_value: 0.0,
            sampling_rate: 0.0,
            long_name_addr: 0,
            display_name_addr: 0,
            additional_byte_offset: 0,
            name: None,
            conversion: None,
        }
    }

    /// Serializes the full 228-byte 3.30 form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        if self.header.block_len != 228 {
            return Err(MdfError::BlockSerializationError(format!(
                "ChannelBlock must have block_len=228, found {}",
                self.header.block_len
            )));
        }

        let mut buffer = Vec::with_capacity(228);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.next_cn_addr.to_le_bytes());
        buffer.extend_from_slice(&self.conversion_addr.to_le_bytes());
        buffer.extend_from_slice(&self.source_addr.to_le_bytes());
        buffer.extend_from_slice(&self.dependency_addr.to_le_bytes());
        buffer.extend_from_slice(&self.comment_addr.to_le_bytes());
        buffer.extend_from_slice(&self.channel_type.to_le_bytes());
        buffer.extend_from_slice(&latin1_fixed(&self.short_name, 31));
        buffer.extend_from_slice(&latin1_fixed(&self.description, 127));
        buffer.extend_from_slice(&self.start_bit.to_le_bytes());
        buffer.extend_from_slice(&self.bit_count.to_le_bytes());
        buffer.extend_from_slice(&self.signal_data_type.to_le_bytes());
        buffer.extend_from_slice(&(self.value_range_valid as u16).to_le_bytes());
        buffer.extend_from_slice(&self.min_value.to_le_bytes());
        buffer.extend_from_slice(&self.max_value.to_le_bytes());
        buffer.extend_from_slice(&self.sampling_rate.to_le_bytes());
        buffer.extend_from_slice(&self.long_name_addr.to_le_bytes());
        buffer.extend_from_slice(&self.display_name_addr.to_le_bytes());
        buffer.extend_from_slice(&self.additional_byte_offset.to_le_bytes());

        if buffer.len() != 228 {
            return Err(MdfError::BlockSerializationError(format!(
                "ChannelBlock must be exactly 228 bytes, got {}",
                buffer.len()
            )));
        }
        Ok(buffer)
    }

    /// Resolves the channel name: the long-name TXBlock when linked,
    /// otherwise the fixed-size short name.
    pub fn resolve_name(&mut self, file_data: &[u8], endian: Endian) -> Result<(), MdfError> {
        if self.name.is_none() {
            self.name = match read_string_block(file_data, self.long_name_addr, endian)? {
                Some(text) => Some(text),
                None => Some(self.short_name.clone()),
            };
        }
        Ok(())
    }

    /// Resolves the conversion block behind `conversion_addr`, if any.
    pub fn resolve_conversion(&mut self, file_data: &[u8], endian: Endian) -> Result<(), MdfError> {
        if self.conversion.is_none() && self.conversion_addr != 0 {
            let offset = self.conversion_addr as usize;

            let expected_bytes = offset + 46;
            if file_data.len() < expected_bytes {
                return Err(MdfError::TooShortBuffer {
                    actual:   file_data.len(),
                    expected: expected_bytes,
                    file:     file!(),
                    line:     line!(),
                });
            }

            let conv_block = ConversionBlock::from_bytes(&file_data[offset..], endian, file_data)?;
            self.conversion = Some(conv_block);
        }
        Ok(())
    }
}
