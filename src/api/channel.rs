use crate::parsing::decoder::SampleColumn;
use crate::store::ChannelEntry;

/// High level read-only handle for a single stored channel.
pub struct Channel<'a> {
    name: &'a str,
    entry: &'a ChannelEntry,
}

impl<'a> Channel<'a> {
    pub(crate) fn new(name: &'a str, entry: &'a ChannelEntry) -> Self {
        Channel { name, entry }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn unit(&self) -> &str {
        &self.entry.unit
    }

    pub fn description(&self) -> &str {
        &self.entry.description
    }

    /// Name of the master channel this channel is sampled against.
    pub fn master(&self) -> Option<&str> {
        self.entry.master.as_deref()
    }

    pub fn data(&self) -> &SampleColumn {
        &self.entry.data
    }

    pub fn len(&self) -> usize {
        self.entry.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.data.is_empty()
    }
}
