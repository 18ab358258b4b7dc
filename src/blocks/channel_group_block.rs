use crate::blocks::common::{BlockHeader, BlockParse, Endian};
use crate::error::MdfError;

/// CGBlock: fixed-layout record definition inside a data group.
///
/// Revision 3.0 files stop after the record count (26 bytes); the sample
/// reduction link was appended later for the 30-byte form.
#[derive(Debug, Clone)]
pub struct ChannelGroupBlock {
    pub header: BlockHeader,
    pub next_cg_addr: u32,
    pub first_cn_addr: u32,
    pub comment_addr: u32,
    pub record_id: u16,
    pub n_channels: u16,
    pub record_size: u16, // bytes per record, record ID bytes excluded
    pub n_records: u32,
    pub first_sr_addr: u32,
}

impl BlockParse for ChannelGroupBlock {
    const ID: &'static str = "CG";

    fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, MdfError> {
        let header = Self::parse_header(bytes, endian)?;

        let expected_bytes = 26;
        if bytes.len() < expected_bytes {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: expected_bytes,
                file:     file!(),
                line:     line!(),
            });
        }

        Ok(Self {
            header: header.clone(),
            next_cg_addr: endian.read_u32(&bytes[4..8]),
            first_cn_addr: endian.read_u32(&bytes[8..12]),
            comment_addr: endian.read_u32(&bytes[12..16]),
            record_id: endian.read_u16(&bytes[16..18]),
            n_channels: endian.read_u16(&bytes[18..20]),
            record_size: endian.read_u16(&bytes[20..22]),
            n_records: endian.read_u32(&bytes[22..26]),
            first_sr_addr: if header.block_len >= 30 && bytes.len() >= 30 {
                endian.read_u32(&bytes[26..30])
            } else {
                0
            },
        })
    }
}

impl ChannelGroupBlock {
    pub fn default() -> Self {
        ChannelGroupBlock {
            header: BlockHeader { id: String::from("CG"), block_len: 30 },
            next_cg_addr: 0,
            first_cn_addr: 0,
            comment_addr: 0,
            record_id: 0,
            n_channels: 0,
            record_size: 0,
            n_records: 0,
            first_sr_addr: 0,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        let mut buffer = Vec::with_capacity(30);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.next_cg_addr.to_le_bytes());
        buffer.extend_from_slice(&self.first_cn_addr.to_le_bytes());
        buffer.extend_from_slice(&self.comment_addr.to_le_bytes());
        buffer.extend_from_slice(&self.record_id.to_le_bytes());
        buffer.extend_from_slice(&self.n_channels.to_le_bytes());
        buffer.extend_from_slice(&self.record_size.to_le_bytes());
        buffer.extend_from_slice(&self.n_records.to_le_bytes());
        buffer.extend_from_slice(&self.first_sr_addr.to_le_bytes());

        if buffer.len() != 30 {
            return Err(MdfError::BlockSerializationError(format!(
                "ChannelGroupBlock must be exactly 30 bytes, got {}",
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}
