use crate::blocks::common::{BlockHeader, BlockParse, Endian, latin1_exact, latin1_fixed, latin1_to_string};
use crate::error::MdfError;

/// HDBlock following the IDBlock at offset 64.
///
/// Revision 3.0 files carry the 164-byte short form without the timestamp
/// tail; 3.2 and later use the full 208 bytes.
#[derive(Debug, Clone)]
pub struct HeaderBlock {
    pub header: BlockHeader,
    pub first_dg_addr: u32,
    pub comment_addr: u32, // file comment TXBlock
    pub program_addr: u32, // PRBlock
    pub n_data_groups: u16,
    pub date: String, // "dd:mm:yyyy"
    pub time: String, // "HH:MM:SS"
    pub author: String,
    pub organization: String,
    pub project: String,
    pub subject: String,
    pub timestamp_ns: u64,
    pub utc_offset: i16,
    pub time_quality: u16,
    pub timer_id: String,
}

impl BlockParse for HeaderBlock {
    const ID: &'static str = "HD";

    fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, MdfError> {
        let header = Self::parse_header(bytes, endian)?;

        let expected_bytes = 164;
        if bytes.len() < expected_bytes {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: expected_bytes,
                file:     file!(),
                line:     line!(),
            });
        }

        let extended = header.block_len >= 208 && bytes.len() >= 208;
        Ok(Self {
            header,
            first_dg_addr: endian.read_u32(&bytes[4..8]),
            comment_addr: endian.read_u32(&bytes[8..12]),
            program_addr: endian.read_u32(&bytes[12..16]),
            n_data_groups: endian.read_u16(&bytes[16..18]),
            date: latin1_to_string(&bytes[18..28]),
            time: latin1_to_string(&bytes[28..36]),
            author: latin1_to_string(&bytes[36..68]),
            organization: latin1_to_string(&bytes[68..100]),
            project: latin1_to_string(&bytes[100..132]),
            subject: latin1_to_string(&bytes[132..164]),
            timestamp_ns: if extended { endian.read_u64(&bytes[164..172]) } else { 0 },
            utc_offset: if extended { endian.read_i16(&bytes[172..174]) } else { 0 },
            time_quality: if extended { endian.read_u16(&bytes[174..176]) } else { 0 },
            timer_id: if extended {
                latin1_to_string(&bytes[176..208])
            } else {
                String::new()
            },
        })
    }
}

impl HeaderBlock {
    pub fn default() -> Self {
        HeaderBlock {
            header: BlockHeader { id: String::from("HD"), block_len: 208 },
            first_dg_addr: 0,
            comment_addr: 0,
            program_addr: 0,
            n_data_groups: 0,
            date: String::new(),
            time: String::new(),
            author: String::new(),
            organization: String::new(),
            project: String::new(),
            subject: String::new(),
            timestamp_ns: 0,
            utc_offset: 1,
            time_quality: 0,
            timer_id: String::from("Local PC Reference Time"),
        }
    }

    /// Serializes the full 208-byte 3.30 form.
    ///
    /// Date and time are 10 and 8 raw characters without terminator; the
    /// four metadata fields are 31 characters plus NUL each.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        let mut buffer = Vec::with_capacity(208);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&self.first_dg_addr.to_le_bytes());
        buffer.extend_from_slice(&self.comment_addr.to_le_bytes());
        buffer.extend_from_slice(&self.program_addr.to_le_bytes());
        buffer.extend_from_slice(&self.n_data_groups.to_le_bytes());

        let mut date = latin1_exact(&self.date);
        date.resize(10, b' ');
        buffer.extend_from_slice(&date);
        let mut time = latin1_exact(&self.time);
        time.resize(8, b' ');
        buffer.extend_from_slice(&time);

        buffer.extend_from_slice(&latin1_fixed(&self.author, 31));
        buffer.extend_from_slice(&latin1_fixed(&self.organization, 31));
        buffer.extend_from_slice(&latin1_fixed(&self.project, 31));
        buffer.extend_from_slice(&latin1_fixed(&self.subject, 31));

        buffer.extend_from_slice(&self.timestamp_ns.to_le_bytes());
        buffer.extend_from_slice(&self.utc_offset.to_le_bytes());
        buffer.extend_from_slice(&self.time_quality.to_le_bytes());
        let mut timer = latin1_exact(&self.timer_id);
        timer.resize(32, b' ');
        buffer.extend_from_slice(&timer);

        if buffer.len() != 208 {
            return Err(MdfError::BlockSerializationError(format!(
                "HeaderBlock must be exactly 208 bytes, got {}",
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}
