use crate::blocks::common::{Endian, latin1_exact};
use crate::error::MdfError;

/// The 64-byte IDBlock at the start of every MDF file.
///
/// Unlike every other block it has no id/length header; the first 24 bytes
/// are three fixed-width character fields.
#[derive(Debug, Clone)]
pub struct IdentificationBlock {
    pub file_id: String,        // "MDF     "
    pub version_string: String, // e.g. "3.30    "
    pub program: String,        // writing application
    pub byte_order: Endian,
    pub float_format: u16,
    pub version_number: u16, // e.g. 330
    pub code_page: u16,
}

impl IdentificationBlock {
    /// Parses the IDBlock and validates magic and version.
    ///
    /// The byte-order flag lives inside the block itself, so it is read
    /// before any multi-byte field is interpreted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MdfError> {
        let expected_bytes = 64;
        if bytes.len() < expected_bytes {
            return Err(MdfError::TooShortBuffer {
                actual:   bytes.len(),
                expected: expected_bytes,
                file:     file!(),
                line:     line!(),
            });
        }

        let file_id = String::from_utf8_lossy(&bytes[0..8]).to_string();
        if file_id != "MDF     " {
            return Err(MdfError::FileIdentifierError(file_id));
        }

        // a big-endian producer stores the nonzero flag in its own order,
        // so either byte of the field may carry it
        let byte_order = if bytes[24] != 0 || bytes[25] != 0 {
            Endian::Big
        } else {
            Endian::Little
        };
        let version_number = byte_order.read_u16(&bytes[28..30]);
        if !(300..400).contains(&version_number) {
            return Err(MdfError::FileVersioningError(version_number));
        }

        Ok(Self {
            file_id,
            version_string: String::from_utf8_lossy(&bytes[8..16]).to_string(),
            program: String::from_utf8_lossy(&bytes[16..24]).to_string(),
            byte_order,
            float_format: byte_order.read_u16(&bytes[26..28]),
            version_number,
            code_page: byte_order.read_u16(&bytes[30..32]),
        })
    }

    /// IDBlock for files produced by this crate: little-endian MDF 3.30,
    /// IEEE floats, latin1 code page.
    pub fn default() -> Self {
        IdentificationBlock {
            file_id: String::from("MDF     "),
            version_string: String::from("3.30    "),
            program: String::from("MDFreadr"),
            byte_order: Endian::Little,
            float_format: 0,
            version_number: 330,
            code_page: 28591,
        }
    }

    /// Serializes the IDBlock to its fixed 64-byte form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MdfError> {
        let mut buffer = Vec::with_capacity(64);
        for (field, width) in [
            (&self.file_id, 8usize),
            (&self.version_string, 8),
            (&self.program, 8),
        ] {
            let mut chars = latin1_exact(field);
            chars.resize(width, b' ');
            buffer.extend_from_slice(&chars);
        }
        let order_flag: u16 = match self.byte_order {
            Endian::Little => 0,
            Endian::Big => 1,
        };
        buffer.extend_from_slice(&order_flag.to_le_bytes());
        buffer.extend_from_slice(&self.float_format.to_le_bytes());
        buffer.extend_from_slice(&self.version_number.to_le_bytes());
        buffer.extend_from_slice(&self.code_page.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 32]);

        if buffer.len() != 64 {
            return Err(MdfError::BlockSerializationError(format!(
                "IdentificationBlock must be exactly 64 bytes, got {}",
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}
