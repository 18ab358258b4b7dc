use crate::blocks::data_group_block::DataGroupBlock;
use crate::parsing::raw_channel_group::RawChannelGroup;

#[derive(Debug)]
pub struct RawDataGroup {
    pub block: DataGroupBlock,
    pub channel_groups: Vec<RawChannelGroup>,
}
