//! Implementation of the MdfWriter struct split across several submodules

use std::fs::File;
use std::io::{BufWriter, Seek, Write};

use crate::error::MdfError;

mod data;
mod io;

/// Writer emitting the MDF 3.30 block graph into a single forward stream.
///
/// Forward links are written as zero placeholders and patched by seeking
/// back once the referenced block's position is known, so the sink must
/// support [`Seek`].
pub struct MdfWriter<W: Write + Seek> {
    sink: W,
    offset: u64,
}

impl MdfWriter<BufWriter<File>> {
    /// Creates a buffered writer for the given file path.
    pub fn create(path: &str) -> Result<Self, MdfError> {
        let file = File::create(path)?;
        Ok(MdfWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write + Seek> MdfWriter<W> {
    pub fn new(sink: W) -> Self {
        MdfWriter { sink, offset: 0 }
    }

    /// Returns the current file offset (for block address calculation).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Finalizes the file and hands the sink back.
    pub fn finalize(mut self) -> Result<W, MdfError> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}
