// Low level stream handling for MdfWriter
use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::MdfError;

use super::MdfWriter;

impl<W: Write + Seek> MdfWriter<W> {
    /// Appends a serialized block and returns its starting offset.
    pub(super) fn write_bytes(&mut self, bytes: &[u8]) -> Result<u64, MdfError> {
        self.sink.write_all(bytes)?;
        let block_start = self.offset;
        self.offset += bytes.len() as u64;
        Ok(block_start)
    }

    /// Patches a link (u32 address) at a specific offset in the file and
    /// returns to the current stream position.
    pub(super) fn write_pointer(&mut self, position: u64, address: u32) -> Result<(), MdfError> {
        let current_position = self.offset;
        self.sink.seek(SeekFrom::Start(position))?;
        self.sink.write_u32::<LittleEndian>(address)?;
        self.sink.seek(SeekFrom::Start(current_position))?;
        Ok(())
    }

    /// Patches a u16 field at a specific offset in the file.
    pub(super) fn write_u16_at(&mut self, position: u64, value: u16) -> Result<(), MdfError> {
        let current_position = self.offset;
        self.sink.seek(SeekFrom::Start(position))?;
        self.sink.write_u16::<LittleEndian>(value)?;
        self.sink.seek(SeekFrom::Start(current_position))?;
        Ok(())
    }
}
