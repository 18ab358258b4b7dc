//! Writing of sorted MDF 3.30 files.

mod mdf_writer;

pub use mdf_writer::MdfWriter;
