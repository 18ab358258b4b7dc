use crate::blocks::common::{BlockHeader, BlockParse, Endian};
use crate::error::MdfError;

/// DGBlock: one entry of the data group linked list.
#[derive(Debug, Clone)]
pub struct DataGroupBlock {
    pub header: BlockHeader,
    pub next_dg_addr: u32,
    pub first_cg_addr: u32,
    pub trigger_addr: u32,
    pub data_addr: u32,
    pub n_channel_groups: u16,
    pub n_record_ids: u16, // 0 sorted, 1 leading ID byte, 2 leading and trailing
}

impl BlockParse for DataGroupBlock {
    const ID: &'static str = "DG";

    fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, MdfError> {
        let header = Self::parse_header(bytes, endian)?;

        let expected_bytes = 24;
        if bytes.len() < expected_bytes {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: expected_bytes,
                file:     file!(),
                line:     line!(),
            });
        }

        Ok(Self {
            header,
            next_dg_addr: endian.read_u32(&bytes[4..8]),
            first_cg_addr: endian.read_u32(&bytes[8..12]),
            trigger_addr: endian.read_u32(&bytes[12..16]),
            data_addr: endian.read_u32(&bytes[16..20]),
            n_channel_groups: endian.read_u16(&bytes[20..22]),
            n_record_ids: endian.read_u16(&bytes[22..24]),
        })
    }
}

impl DataGroupBlock {
    pub fn default() -> Self {
        DataGroupBlock {
            header: BlockHeader { id: String::from("DG"), block_len: 28 },
            next_dg_addr: 0,
            first_cg_addr: 0,
            trigger_addr: 0,
            data_addr: 0,
            n_channel_groups: 1,
            n_record_ids: 0,
        }
    }

    /// Serializes the fixed 28-byte form (4 reserved bytes at the tail).
    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        let mut buffer = Vec::with_capacity(28);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.next_dg_addr.to_le_bytes());
        buffer.extend_from_slice(&self.first_cg_addr.to_le_bytes());
        buffer.extend_from_slice(&self.trigger_addr.to_le_bytes());
        buffer.extend_from_slice(&self.data_addr.to_le_bytes());
        buffer.extend_from_slice(&self.n_channel_groups.to_le_bytes());
        buffer.extend_from_slice(&self.n_record_ids.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 4]);

        if buffer.len() != 28 {
            return Err(MdfError::BlockSerializationError(format!(
                "DataGroupBlock must be exactly 28 bytes, got {}",
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}
