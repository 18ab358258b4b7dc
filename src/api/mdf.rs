use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use log::warn;

use crate::api::channel::Channel;
use crate::error::MdfError;
use crate::parsing::decoder::{SampleColumn, read_sorted_block, read_unsorted_block, repack_bits};
use crate::parsing::mdf_file::MdfFile;
use crate::parsing::raw_data_group::RawDataGroup;
use crate::parsing::record_layout::{ChannelDescriptor, RecordSchema};
use crate::store::{ChannelStore, FileMetadata};
use crate::writer::MdfWriter;

/// Knobs of [`Mdf::from_file_with`].
pub struct ReadOptions {
    /// Restrict decoding to these channels; masters ride along.
    pub channel_list: Option<Vec<String>>,
    /// Apply raw-to-physical conversions right after reading.
    pub convert_after_read: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions { channel_list: None, convert_after_read: true }
    }
}

/// High level representation of an MDF 3.x measurement.
///
/// Reading walks the block graph, decodes every record block and leaves the
/// per-channel columns in a [`ChannelStore`]. Data groups that cannot be
/// decoded are skipped with a warning; only I/O failures abort the read.
#[derive(Debug, Default)]
pub struct Mdf {
    store: ChannelStore,
}

impl Mdf {
    /// Read an MDF 3.x file from disk with default options.
    pub fn from_file(path: &str) -> Result<Self, MdfError> {
        Self::from_file_with(path, ReadOptions::default())
    }

    /// Read an MDF 3.x file from disk.
    pub fn from_file_with(path: &str, options: ReadOptions) -> Result<Self, MdfError> {
        let file = MdfFile::parse_from_file(path)?;
        let mut store = ChannelStore::new();
        store.metadata = metadata_from(&file);

        let channel_set: Option<HashSet<String>> =
            options.channel_list.map(|list| list.into_iter().collect());

        for (group_index, data_group) in file.data_groups.iter().enumerate() {
            match read_data_group(&file, group_index, data_group, channel_set.as_ref(), &mut store)
            {
                Ok(()) => {}
                Err(err @ MdfError::IOError(_)) => return Err(err),
                Err(err) => warn!("skipping data group {group_index}: {err}"),
            }
        }

        if options.convert_after_read {
            store.convert_all();
        }
        Ok(Mdf { store })
    }

    /// Wrap an existing container, e.g. one assembled by hand for writing.
    pub fn from_store(store: ChannelStore) -> Self {
        Mdf { store }
    }

    pub fn store(&self) -> &ChannelStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChannelStore {
        &mut self.store
    }

    /// Handles for all stored channels, grouped by master.
    pub fn channels(&self) -> Vec<Channel<'_>> {
        self.store
            .channel_names()
            .into_iter()
            .filter_map(|name| self.store.get(name).map(|entry| Channel::new(name, entry)))
            .collect()
    }

    pub fn channel_data(&self, name: &str) -> Option<&SampleColumn> {
        self.store.channel_data(name)
    }

    /// JSON dump of file metadata and the channel list.
    pub fn metadata_json(&self) -> Result<String, MdfError> {
        self.store.metadata_json()
    }

    /// Write the container as a sorted MDF 3.30 file.
    ///
    /// Channels are emitted as currently stored; pending conversions are not
    /// applied here.
    pub fn write(&self, path: &str) -> Result<(), MdfError> {
        let mut writer = MdfWriter::create(path)?;
        writer.write_store(&self.store)?;
        writer.finalize()?;
        Ok(())
    }
}

fn metadata_from(file: &MdfFile) -> FileMetadata {
    let header = &file.header;
    // "dd:mm:yyyy" to ISO8601
    let parts: Vec<&str> = header.date.split(':').collect();
    let date = match parts.as_slice() {
        [day, month, year] => format!("{year}-{month}-{day}"),
        _ => header.date.clone(),
    };
    FileMetadata {
        author: header.author.clone(),
        organisation: header.organization.clone(),
        project: header.project.clone(),
        subject: header.subject.clone(),
        comment: file.comment.clone().unwrap_or_default(),
        date,
        time: header.time.clone(),
    }
}

/// Builds the record schemas of one data group and decodes its record
/// block into the store.
fn read_data_group(
    file: &MdfFile,
    group_index: usize,
    data_group: &RawDataGroup,
    channel_set: Option<&HashSet<String>>,
    store: &mut ChannelStore,
) -> Result<(), MdfError> {
    let record_id_width = data_group.block.n_record_ids;
    let pointer = data_group.block.data_addr as u64;

    let mut schemas = Vec::new();
    for (cg_index, channel_group) in data_group.channel_groups.iter().enumerate() {
        if channel_group.block.n_records == 0 {
            continue;
        }
        let mut descriptors = Vec::with_capacity(channel_group.channels.len());
        for block in &channel_group.channels {
            descriptors.push(ChannelDescriptor::from_block(block, record_id_width, file.endian)?);
        }
        schemas.push(RecordSchema::build(
            group_index,
            cg_index,
            channel_group.block.record_id,
            record_id_width,
            channel_group.block.record_size as usize,
            channel_group.block.n_records as usize,
            descriptors,
        )?);
    }
    if schemas.is_empty() {
        return Ok(());
    }

    // With a filter: drop groups containing nothing of interest and pull in
    // the master of every group that stays.
    let local_set = match channel_set {
        None => None,
        Some(set) => {
            let mut local: HashSet<String> = set.clone();
            let mut any = false;
            for schema in &schemas {
                if schema.channels.iter().any(|channel| local.contains(&channel.name)) {
                    any = true;
                    if let Some(master) = schema.master_name() {
                        local.insert(master.to_string());
                    }
                }
            }
            if !any {
                return Ok(());
            }
            Some(local)
        }
    };

    let mut cursor = Cursor::new(&file.mmap[..]);
    if schemas.len() == 1 {
        let schema = schemas.remove(0);
        let columns = read_sorted_block(&mut cursor, pointer, &schema, local_set.as_ref())?;
        store_group(&schema, columns, local_set.as_ref(), store);
    } else if record_id_width == 0 {
        return Err(MdfError::SchemaError {
            channel: String::new(),
            reason: "several channel groups share one data block but records carry no ID byte"
                .to_string(),
        });
    } else {
        let mut by_id: HashMap<u8, RecordSchema> = HashMap::new();
        for schema in schemas {
            if let Some(previous) = by_id.insert(schema.record_id, schema) {
                return Err(MdfError::DecodeError {
                    record_index: 0,
                    channel: previous.master_name().unwrap_or_default().to_string(),
                    reason: format!("record ID {} used by two channel groups", previous.record_id),
                });
            }
        }
        let block_length: usize = by_id
            .values()
            .map(|schema| schema.record_stride() * schema.number_of_records)
            .sum();
        let mut decoded =
            read_unsorted_block(&mut cursor, pointer, block_length, &by_id, local_set.as_ref())?;
        let mut ids: Vec<u8> = by_id.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(columns) = decoded.remove(&id) {
                store_group(&by_id[&id], columns, local_set.as_ref(), store);
            }
        }
    }
    Ok(())
}

/// Repacks bit fields and pushes the decoded columns of one channel group
/// into the container.
fn store_group(
    schema: &RecordSchema,
    mut columns: Vec<Option<SampleColumn>>,
    channel_set: Option<&HashSet<String>>,
    store: &mut ChannelStore,
) {
    let master_name = schema.master_name().unwrap_or_default().to_string();
    // a second group with the same master keeps its own grouping key
    let master_key = if store.contains(&master_name) {
        format!("{}_{}", master_name, schema.data_group)
    } else {
        master_name
    };

    for (idx, channel) in schema.channels.iter().enumerate() {
        if let Some(set) = channel_set {
            if !set.contains(&channel.name) {
                continue;
            }
        }
        let Some(mut column) = columns[idx].take() else {
            continue;
        };
        if column.is_empty() {
            continue;
        }
        repack_bits(&mut column, channel);
        store.add_channel(
            schema.data_group,
            &channel.name,
            column,
            Some(&master_key),
            1,
            &channel.unit,
            &channel.description,
            Some(channel.conversion.clone()),
        );
    }
}
