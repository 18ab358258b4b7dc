//! Minimal utilities for reading and writing MDF 3.x files.
//!
//! The crate exposes a high level API under [`api`] to load measured data
//! files of the 3.0 to 3.3 revisions as well as a [`writer::MdfWriter`] to
//! produce MDF 3.30 files.  Converted channels live in a
//! [`store::ChannelStore`] keyed by channel name.

pub mod blocks;
pub mod error;
pub mod store;
pub mod writer;

pub mod parsing {
    pub mod decoder;
    pub mod mdf_file;
    pub mod raw_channel_group;
    pub mod raw_data_group;
    pub mod record_layout;
}

pub mod api {
    pub mod channel;
    pub mod mdf;
}
