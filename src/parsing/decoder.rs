use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek, SeekFrom};

use log::{debug, warn};

use crate::blocks::common::latin1_to_string;
use crate::error::MdfError;
use crate::parsing::record_layout::{ChannelDescriptor, NativeFormat, NativeType, RecordSchema};

/// Signal data types the bit-repack step may shift and mask.
const INTEGER_SIGNAL_TYPES: [u16; 6] = [0, 1, 9, 10, 13, 14];

/// A decoded per-channel column keeping the native sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleColumn {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Text(Vec<String>),
    Bytes(Vec<Vec<u8>>),
}

impl SampleColumn {
    pub fn with_capacity(format: &NativeFormat, capacity: usize) -> Self {
        match format.ty {
            NativeType::U8 => SampleColumn::U8(Vec::with_capacity(capacity)),
            NativeType::U16 => SampleColumn::U16(Vec::with_capacity(capacity)),
            NativeType::U32 => SampleColumn::U32(Vec::with_capacity(capacity)),
            NativeType::U64 => SampleColumn::U64(Vec::with_capacity(capacity)),
            NativeType::I8 => SampleColumn::I8(Vec::with_capacity(capacity)),
            NativeType::I16 => SampleColumn::I16(Vec::with_capacity(capacity)),
            NativeType::I32 => SampleColumn::I32(Vec::with_capacity(capacity)),
            NativeType::I64 => SampleColumn::I64(Vec::with_capacity(capacity)),
            NativeType::F32 => SampleColumn::F32(Vec::with_capacity(capacity)),
            NativeType::F64 => SampleColumn::F64(Vec::with_capacity(capacity)),
            NativeType::Text(_) => SampleColumn::Text(Vec::with_capacity(capacity)),
            NativeType::Bytes(_) => SampleColumn::Bytes(Vec::with_capacity(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleColumn::U8(v) => v.len(),
            SampleColumn::U16(v) => v.len(),
            SampleColumn::U32(v) => v.len(),
            SampleColumn::U64(v) => v.len(),
            SampleColumn::I8(v) => v.len(),
            SampleColumn::I16(v) => v.len(),
            SampleColumn::I32(v) => v.len(),
            SampleColumn::I64(v) => v.len(),
            SampleColumn::F32(v) => v.len(),
            SampleColumn::F64(v) => v.len(),
            SampleColumn::Text(v) => v.len(),
            SampleColumn::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            SampleColumn::U8(_) => "u8",
            SampleColumn::U16(_) => "u16",
            SampleColumn::U32(_) => "u32",
            SampleColumn::U64(_) => "u64",
            SampleColumn::I8(_) => "i8",
            SampleColumn::I16(_) => "i16",
            SampleColumn::I32(_) => "i32",
            SampleColumn::I64(_) => "i64",
            SampleColumn::F32(_) => "f32",
            SampleColumn::F64(_) => "f64",
            SampleColumn::Text(_) => "text",
            SampleColumn::Bytes(_) => "bytes",
        }
    }

    /// Numeric view of the column; `None` for text and byte-array columns.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        let values = match self {
            SampleColumn::U8(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::U16(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::U32(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::U64(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::I8(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::I16(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::I32(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::I64(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::F32(v) => v.iter().map(|&x| x as f64).collect(),
            SampleColumn::F64(v) => v.clone(),
            SampleColumn::Text(_) | SampleColumn::Bytes(_) => return None,
        };
        Some(values)
    }

    /// Decodes one on-disk field and appends it.
    ///
    /// `bytes` is the channel's slice of a record; integer fields may be
    /// narrower than the native type and are zero- or sign-extended.
    fn push_raw(&mut self, bytes: &[u8], format: &NativeFormat) {
        let endian = format.endian;
        match self {
            SampleColumn::U8(v) => v.push(endian.read_uint(bytes) as u8),
            SampleColumn::U16(v) => v.push(endian.read_uint(bytes) as u16),
            SampleColumn::U32(v) => v.push(endian.read_uint(bytes) as u32),
            SampleColumn::U64(v) => v.push(endian.read_uint(bytes)),
            SampleColumn::I8(v) => v.push(endian.read_int(bytes) as i8),
            SampleColumn::I16(v) => v.push(endian.read_int(bytes) as i16),
            SampleColumn::I32(v) => v.push(endian.read_int(bytes) as i32),
            SampleColumn::I64(v) => v.push(endian.read_int(bytes)),
            SampleColumn::F32(v) => v.push(endian.read_f32(bytes)),
            SampleColumn::F64(v) => v.push(endian.read_f64(bytes)),
            SampleColumn::Text(v) => v.push(latin1_to_string(bytes)),
            SampleColumn::Bytes(v) => v.push(bytes.to_vec()),
        }
    }
}

/// Reads the record block of a sorted data group (single channel group, no
/// record-ID bytes in front of the records).
///
/// With no channel filter, an aligned layout and no hidden bytes every
/// storage slot is decoded in one pass over the block. Otherwise only the
/// requested channels (the master is always added) are sliced out of each
/// record.
pub fn read_sorted_block<R: Read + Seek>(
    fid: &mut R,
    pointer: u64,
    schema: &RecordSchema,
    channel_set: Option<&HashSet<String>>,
) -> Result<Vec<Option<SampleColumn>>, MdfError> {
    fid.seek(SeekFrom::Start(pointer))?;
    let stride = schema.record_stride();
    let expected = stride * schema.number_of_records;
    let mut block = Vec::with_capacity(expected);
    fid.take(expected as u64).read_to_end(&mut block)?;
    if block.len() < expected {
        return Err(MdfError::DecodeError {
            record_index: block.len() / stride.max(1),
            channel: schema.master_name().unwrap_or_default().to_string(),
            reason: format!(
                "block ends after {} bytes, {} records of {} bytes declared",
                block.len(),
                schema.number_of_records,
                stride
            ),
        });
    }

    debug!(
        "data group {} channel group {}: record format {}",
        schema.data_group,
        schema.channel_group,
        schema.record_struct_format()
    );

    if channel_set.is_none() && schema.byte_aligned && !schema.hidden_bytes {
        decode_all_slots(schema, &block, stride)
    } else {
        decode_selected(schema, &block, stride, channel_set)
    }
}

/// Fast path: one strided pass per storage slot, aliased channels share the
/// decoded column.
fn decode_all_slots(
    schema: &RecordSchema,
    block: &[u8],
    stride: usize,
) -> Result<Vec<Option<SampleColumn>>, MdfError> {
    let mut columns: Vec<Option<SampleColumn>> = vec![None; schema.channels.len()];
    for idx in 0..schema.channels.len() {
        let owner = schema.slot_of_channel[idx];
        if columns[owner].is_none() {
            columns[owner] = Some(decode_channel_column(&schema.channels[owner], block, stride));
        }
        if idx != owner {
            columns[idx] = columns[owner].clone();
        }
    }
    Ok(columns)
}

/// Slow path: per-channel slicing honoring the filter set and skipping
/// hidden trailing bytes via the record stride.
fn decode_selected(
    schema: &RecordSchema,
    block: &[u8],
    stride: usize,
    channel_set: Option<&HashSet<String>>,
) -> Result<Vec<Option<SampleColumn>>, MdfError> {
    let mut columns: Vec<Option<SampleColumn>> = vec![None; schema.channels.len()];
    for (idx, channel) in schema.channels.iter().enumerate() {
        if is_requested(schema, idx, channel_set) {
            columns[idx] = Some(decode_channel_column(channel, block, stride));
        }
    }
    Ok(columns)
}

fn is_requested(
    schema: &RecordSchema,
    idx: usize,
    channel_set: Option<&HashSet<String>>,
) -> bool {
    match channel_set {
        None => true,
        // The master channel rides along with any selection.
        Some(set) => set.contains(&schema.channels[idx].name) || schema.master == Some(idx),
    }
}

fn decode_channel_column(
    channel: &ChannelDescriptor,
    block: &[u8],
    stride: usize,
) -> SampleColumn {
    let n_records = block.len() / stride.max(1);
    let mut column = SampleColumn::with_capacity(&channel.native, n_records);
    for record in block.chunks_exact(stride) {
        column.push_raw(&record[channel.pos_byte_beg..channel.pos_byte_end], &channel.native);
    }
    column
}

/// Decodes a record-ID multiplexed block shared by several channel groups.
///
/// Records are walked byte-wise: one leading ID byte selects the schema,
/// the record body follows, and a second trailing ID byte is skipped for
/// `record_id_width == 2`. Samples accumulate into per-channel columns in
/// on-disk record order.
pub fn read_unsorted_block<R: Read + Seek>(
    fid: &mut R,
    pointer: u64,
    block_length: usize,
    schemas: &HashMap<u8, RecordSchema>,
    channel_set: Option<&HashSet<String>>,
) -> Result<HashMap<u8, Vec<Option<SampleColumn>>>, MdfError> {
    fid.seek(SeekFrom::Start(pointer))?;
    let mut stream = Vec::with_capacity(block_length);
    fid.take(block_length as u64).read_to_end(&mut stream)?;
    if stream.len() < block_length {
        return Err(MdfError::DecodeError {
            record_index: 0,
            channel: String::new(),
            reason: format!(
                "unsorted block ends after {} of {} declared bytes",
                stream.len(),
                block_length
            ),
        });
    }

    let mut columns: HashMap<u8, Vec<Option<SampleColumn>>> = schemas
        .iter()
        .map(|(&id, schema)| {
            let group_columns = schema
                .channels
                .iter()
                .enumerate()
                .map(|(idx, channel)| {
                    is_requested(schema, idx, channel_set).then(|| {
                        SampleColumn::with_capacity(&channel.native, schema.number_of_records)
                    })
                })
                .collect();
            (id, group_columns)
        })
        .collect();

    let mut position = 0usize;
    let mut record_index = 0usize;
    while position < stream.len() {
        let id = stream[position];
        let schema = schemas.get(&id).ok_or(MdfError::UnknownRecordID(id))?;
        let consumed = 1 + schema.cg_record_length + usize::from(schema.record_id_width == 2);
        if position + consumed > stream.len() {
            return Err(MdfError::DecodeError {
                record_index,
                channel: schema.master_name().unwrap_or_default().to_string(),
                reason: "record runs past the end of the block".to_string(),
            });
        }

        // record slice includes the leading ID byte, matching pos_byte_beg
        let record = &stream[position..position + 1 + schema.cg_record_length];
        let group_columns = columns.get_mut(&id).expect("initialized above");
        for (idx, channel) in schema.channels.iter().enumerate() {
            if let Some(column) = group_columns[idx].as_mut() {
                column.push_raw(&record[channel.pos_byte_beg..channel.pos_byte_end], &channel.native);
            }
        }

        position += consumed;
        record_index += 1;
    }

    Ok(columns)
}

/// Normalizes a bit-packed integer channel: shift out the bit offset and
/// mask down to `bit_count` bits.
///
/// Channels whose bit count is a whole number of bytes are left alone.
/// Non-integer signal types with partial bytes are invalid; they are
/// diagnosed and returned uncorrected.
pub fn repack_bits(column: &mut SampleColumn, channel: &ChannelDescriptor) {
    if channel.bit_count == 0 || channel.bit_count % 8 == 0 {
        return;
    }
    if !INTEGER_SIGNAL_TYPES.contains(&channel.signal_type) {
        warn!(
            "channel {}: bit offset/count not applicable to signal data type {}",
            channel.name, channel.signal_type
        );
        return;
    }

    let shift = channel.bit_offset as u32;
    let mask = (1u64 << channel.bit_count) - 1;
    match column {
        SampleColumn::U8(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask as u8),
        SampleColumn::U16(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask as u16),
        SampleColumn::U32(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask as u32),
        SampleColumn::U64(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask),
        SampleColumn::I8(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask as i8),
        SampleColumn::I16(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask as i16),
        SampleColumn::I32(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask as i32),
        SampleColumn::I64(v) => v.iter_mut().for_each(|x| *x = (*x >> shift) & mask as i64),
        _ => warn!(
            "channel {}: cannot repack non-integer column {}",
            channel.name,
            column.dtype()
        ),
    }
}
