use crate::blocks::common::{BlockHeader, BlockParse, Endian, latin1_exact, latin1_to_string};
use crate::error::MdfError;

/// Variable-length TXBlock: header plus NUL-terminated latin1 text.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub header: BlockHeader,
    pub text: String,
}

impl BlockParse for TextBlock {
    const ID: &'static str = "TX";

    fn from_bytes(bytes: &[u8], endian: Endian) -> Result<Self, MdfError> {
        let header = Self::parse_header(bytes, endian)?;

        let expected_bytes = header.block_len as usize;
        if bytes.len() < expected_bytes {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: expected_bytes,
                file:     file!(),
                line:     line!(),
            });
        }

        let text = latin1_to_string(&bytes[4..expected_bytes]);
        Ok(Self { header, text })
    }
}

impl TextBlock {
    pub fn new(text: &str) -> Self {
        TextBlock {
            header: BlockHeader {
                id: String::from("TX"),
                block_len: (4 + text.len() + 1) as u16,
            },
            text: text.to_string(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        let mut buffer = Vec::with_capacity(self.header.block_len as usize);
        buffer.extend_from_slice(&self.header.to_bytes()?);
        buffer.extend_from_slice(&latin1_exact(&self.text));
        buffer.push(0);

        if buffer.len() != self.header.block_len as usize {
            return Err(MdfError::BlockSerializationError(format!(
                "TextBlock declares {} bytes but serialized to {}",
                self.header.block_len,
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}
