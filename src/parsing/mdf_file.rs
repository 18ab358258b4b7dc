use memmap2::Mmap;
use std::fs::File;

use crate::blocks::{
    channel_block::ChannelBlock,
    channel_group_block::ChannelGroupBlock,
    common::{BlockParse, Endian, read_string_block},
    data_group_block::DataGroupBlock,
    header_block::HeaderBlock,
    identification_block::IdentificationBlock,
};
use crate::error::MdfError;
use crate::parsing::raw_channel_group::RawChannelGroup;
use crate::parsing::raw_data_group::RawDataGroup;

#[derive(Debug)]
pub struct MdfFile {
    pub identification: IdentificationBlock,
    pub header: HeaderBlock,
    pub comment: Option<String>,
    pub data_groups: Vec<RawDataGroup>,
    pub endian: Endian,
    pub mmap: Mmap, // Keep the mmap in the MdfFile to guarantee lifetime for our slices.
}

impl MdfFile {
    /// Parse the block graph of an MDF 3.x file from a given file path.
    ///
    /// The identification block decides the byte order all further blocks
    /// are read with. Data groups, channel groups and channels form linked
    /// lists which are walked here; record blocks themselves are not
    /// touched.
    ///
    /// # Returns
    /// An [`MdfFile`] description tree or an [`MdfError`] if the file could
    /// not be read or decoded.
    pub fn parse_from_file(path: &str) -> Result<Self, MdfError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < 64 + 164 {
            return Err(MdfError::TooShortBuffer {
                actual:   mmap.len(),
                expected: 64 + 164,
                file:     file!(),
                line:     line!(),
            });
        }

        let identification = IdentificationBlock::from_bytes(&mmap[0..64])?;
        let endian = identification.byte_order;
        let header = HeaderBlock::from_bytes(&mmap[64..], endian)?;
        let comment = read_string_block(&mmap, header.comment_addr, endian)?;

        let mut data_groups = Vec::new();
        let mut dg_addr = header.first_dg_addr;
        while dg_addr != 0 {
            let dg_offset = dg_addr as usize;
            let data_group_block = DataGroupBlock::from_bytes(&mmap[dg_offset..], endian)?;
            let next_dg_addr = data_group_block.next_dg_addr;

            let mut cg_addr = data_group_block.first_cg_addr;
            let mut channel_groups = Vec::new();
            while cg_addr != 0 {
                let cg_offset = cg_addr as usize;
                let channel_group_block =
                    ChannelGroupBlock::from_bytes(&mmap[cg_offset..], endian)?;
                cg_addr = channel_group_block.next_cg_addr;

                let channels = read_channels(&mmap, channel_group_block.first_cn_addr, endian)?;
                channel_groups.push(RawChannelGroup { block: channel_group_block, channels });
            }

            data_groups.push(RawDataGroup { block: data_group_block, channel_groups });
            dg_addr = next_dg_addr;
        }

        Ok(Self {
            identification,
            header,
            comment,
            data_groups,
            endian,
            mmap,
        })
    }
}

/// Walks a channel linked list, resolving names and conversion blocks.
fn read_channels(
    mmap: &[u8],
    first_cn_addr: u32,
    endian: Endian,
) -> Result<Vec<ChannelBlock>, MdfError> {
    let mut channels = Vec::new();
    let mut cn_addr = first_cn_addr;
    while cn_addr != 0 {
        let cn_offset = cn_addr as usize;
        let mut channel = ChannelBlock::from_bytes(&mmap[cn_offset..], endian)?;
        channel.resolve_name(mmap, endian)?;
        channel.resolve_conversion(mmap, endian)?;
        cn_addr = channel.next_cn_addr;
        channels.push(channel);
    }
    Ok(channels)
}
