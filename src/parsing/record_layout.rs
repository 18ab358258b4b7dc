use serde::Serialize;

use crate::blocks::channel_block::ChannelBlock;
use crate::blocks::common::Endian;
use crate::blocks::conversion::Conversion;
use crate::error::MdfError;

/// Storage type a channel decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NativeType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Fixed-width latin1 text, width in bytes.
    Text(u16),
    /// Opaque byte buffer, width in bytes.
    Bytes(u16),
}

/// Native type plus the byte order the on-disk value uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFormat {
    pub ty: NativeType,
    pub endian: Endian,
}

impl NativeFormat {
    /// Width of the native type, not of the on-disk field.
    pub fn native_bytes(&self) -> usize {
        match self.ty {
            NativeType::U8 | NativeType::I8 => 1,
            NativeType::U16 | NativeType::I16 => 2,
            NativeType::U32 | NativeType::I32 | NativeType::F32 => 4,
            NativeType::U64 | NativeType::I64 | NativeType::F64 => 8,
            NativeType::Text(width) | NativeType::Bytes(width) => width as usize,
        }
    }

    /// Single-element C-style format code for manual per-field unpacking,
    /// e.g. `<I`, `>d` or `16s`.
    pub fn struct_code(&self) -> String {
        let code = match self.ty {
            NativeType::U8 => "B",
            NativeType::U16 => "H",
            NativeType::U32 => "I",
            NativeType::U64 => "Q",
            NativeType::I8 => "b",
            NativeType::I16 => "h",
            NativeType::I32 => "i",
            NativeType::I64 => "q",
            NativeType::F32 => "f",
            NativeType::F64 => "d",
            NativeType::Text(width) | NativeType::Bytes(width) => {
                return format!("{width}s");
            }
        };
        match self.endian {
            Endian::Little => format!("<{code}"),
            Endian::Big => format!(">{code}"),
        }
    }
}

/// Maps a signal data type and bit count to the native storage format.
///
/// Integer widths are widened to the next of 8/16/32/64 bits; floats must
/// be exactly 32 or 64 bits wide. Types 0 to 3 follow the file byte order,
/// 9 to 12 are big-endian and 13 to 16 little-endian regardless of it.
pub fn native_format(
    signal_type: u16,
    bit_count: u16,
    file_order: Endian,
) -> Result<NativeFormat, MdfError> {
    let endian = match signal_type {
        0..=3 => file_order,
        9..=12 => Endian::Big,
        7 | 8 | 13..=16 => Endian::Little,
        other => {
            return Err(MdfError::SchemaError {
                channel: String::new(),
                reason: format!("unsupported signal data type {other}"),
            });
        }
    };

    let ty = match signal_type {
        0 | 9 | 13 => match bit_count {
            1..=8 => NativeType::U8,
            9..=16 => NativeType::U16,
            17..=32 => NativeType::U32,
            33..=64 => NativeType::U64,
            other => {
                return Err(MdfError::SchemaError {
                    channel: String::new(),
                    reason: format!("unsupported number of bits for unsigned int: {other}"),
                });
            }
        },
        1 | 10 | 14 => match bit_count {
            1..=8 => NativeType::I8,
            9..=16 => NativeType::I16,
            17..=32 => NativeType::I32,
            33..=64 => NativeType::I64,
            other => {
                return Err(MdfError::SchemaError {
                    channel: String::new(),
                    reason: format!("unsupported number of bits for signed int: {other}"),
                });
            }
        },
        2 | 3 | 11 | 12 | 15 | 16 => match bit_count {
            32 => NativeType::F32,
            64 => NativeType::F64,
            other => {
                return Err(MdfError::SchemaError {
                    channel: String::new(),
                    reason: format!("unsupported number of bits for floating point: {other}"),
                });
            }
        },
        7 | 8 => {
            if bit_count == 0 || bit_count % 8 != 0 {
                return Err(MdfError::SchemaError {
                    channel: String::new(),
                    reason: format!("text/byte-array channels need whole bytes, got {bit_count} bits"),
                });
            }
            if signal_type == 7 {
                NativeType::Text(bit_count / 8)
            } else {
                NativeType::Bytes(bit_count / 8)
            }
        }
        _ => unreachable!("filtered above"),
    };

    Ok(NativeFormat { ty, endian })
}

/// Format-string variant of [`native_format`] with identical semantics.
pub fn struct_format(
    signal_type: u16,
    bit_count: u16,
    file_order: Endian,
) -> Result<String, MdfError> {
    native_format(signal_type, bit_count, file_order).map(|format| format.struct_code())
}

/// Immutable byte/bit layout of one channel inside a record.
#[derive(Debug, Clone)]
pub struct ChannelDescriptor {
    pub name: String,
    pub signal_type: u16,
    pub bit_count: u16,
    pub byte_offset: usize,
    pub bit_offset: u8,
    pub n_bytes: usize,
    pub channel_type: u16,
    /// Start of the field in the record, leading record-ID byte included.
    pub pos_byte_beg: usize,
    pub pos_byte_end: usize,
    pub native: NativeFormat,
    pub unit: String,
    pub description: String,
    pub conversion: Conversion,
}

impl ChannelDescriptor {
    /// Builds the descriptor from a parsed CNBlock.
    ///
    /// `record_id_width` is the data group's record-ID count; only the one
    /// leading byte shifts channel positions, a trailing ID byte never does.
    pub fn from_block(
        block: &ChannelBlock,
        record_id_width: u16,
        file_order: Endian,
    ) -> Result<Self, MdfError> {
        let name = block.name.clone().unwrap_or_else(|| block.short_name.clone());
        let native = native_format(block.signal_data_type, block.bit_count, file_order)
            .map_err(|err| err.for_channel(&name))?;

        let byte_offset =
            block.start_bit as usize / 8 + block.additional_byte_offset as usize;
        let bit_offset = (block.start_bit % 8) as u8;
        let n_bytes = (block.bit_count as usize).div_ceil(8);
        let id_prefix = usize::from(record_id_width >= 1);

        let (unit, conversion) = match &block.conversion {
            Some(cc) => (cc.unit.clone(), cc.conversion.clone()),
            None => (String::new(), Conversion::Identity),
        };

        Ok(Self {
            name,
            signal_type: block.signal_data_type,
            bit_count: block.bit_count,
            byte_offset,
            bit_offset,
            n_bytes,
            channel_type: block.channel_type,
            pos_byte_beg: id_prefix + byte_offset,
            pos_byte_end: id_prefix + byte_offset + n_bytes,
            native,
            unit: unit.trim().to_string(),
            description: block.description.clone(),
            conversion,
        })
    }

    pub fn pos_bit_beg(&self) -> usize {
        self.pos_byte_beg * 8 + self.bit_offset as usize
    }

    pub fn pos_bit_end(&self) -> usize {
        self.pos_bit_beg() + self.bit_count as usize
    }
}

/// Record schema of one channel group: channel layouts, storage slots and
/// the flags steering the reader paths.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub data_group: usize,
    pub channel_group: usize,
    pub record_id: u8,
    pub record_id_width: u16, // 0, 1 or 2 record-ID bytes per record
    pub cg_record_length: usize,
    pub number_of_records: usize,
    /// Ordered by bit position in the record.
    pub channels: Vec<ChannelDescriptor>,
    /// Index of the channel owning each channel's storage slot; bit-packed
    /// channels alias the slot of the channel they are embedded in.
    pub slot_of_channel: Vec<usize>,
    pub byte_aligned: bool,
    pub hidden_bytes: bool,
    pub master: Option<usize>,
    /// Sum of the slot widths, record-ID bytes excluded.
    pub record_length: usize,
}

impl RecordSchema {
    pub fn build(
        data_group: usize,
        channel_group: usize,
        record_id: u16,
        record_id_width: u16,
        cg_record_length: usize,
        number_of_records: usize,
        mut channels: Vec<ChannelDescriptor>,
    ) -> Result<Self, MdfError> {
        channels.sort_by_key(|channel| (channel.byte_offset, channel.bit_offset));

        let mut slot_of_channel = Vec::with_capacity(channels.len());
        let mut master = None;
        let mut byte_aligned = true;
        let mut record_length = 0usize;

        for (idx, channel) in channels.iter().enumerate() {
            if master.is_none() || channel.channel_type == 1 {
                master = Some(idx);
            }

            if channel.byte_offset + channel.n_bytes > cg_record_length {
                return Err(MdfError::SchemaError {
                    channel: channel.name.clone(),
                    reason: format!(
                        "field of {} bytes at offset {} exceeds the record length of {}",
                        channel.n_bytes, channel.byte_offset, cg_record_length
                    ),
                });
            }

            let mut embedded = false;
            if idx > 0 {
                let prev = &channels[idx - 1];
                let prev_end_bits = 8 * (prev.pos_byte_beg + prev.n_bytes);
                if channel.byte_offset >= prev.byte_offset
                    && channel.pos_bit_beg() < prev_end_bits
                    && channel.pos_bit_end() > prev_end_bits
                {
                    // straddles the previous channel's last byte
                    byte_aligned = false;
                }
                if channel.pos_bit_beg() >= 8 * prev.pos_byte_beg
                    && channel.pos_bit_end() <= prev_end_bits
                {
                    embedded = true;
                }
            }

            if embedded {
                let owner = slot_of_channel[idx - 1];
                slot_of_channel.push(owner);
            } else {
                slot_of_channel.push(idx);
                record_length += channel.n_bytes;
            }
        }

        Ok(Self {
            data_group,
            channel_group,
            record_id: record_id as u8,
            record_id_width,
            cg_record_length,
            number_of_records,
            channels,
            slot_of_channel,
            byte_aligned,
            hidden_bytes: cg_record_length > record_length,
            master,
            record_length,
        })
    }

    /// Bytes one record occupies on disk, record-ID bytes included.
    pub fn record_stride(&self) -> usize {
        self.cg_record_length + self.record_id_width as usize
    }

    pub fn master_name(&self) -> Option<&str> {
        self.master.map(|idx| self.channels[idx].name.as_str())
    }

    /// Ordered storage slots, one per non-overlapping byte region, with the
    /// record-ID slots the on-disk records carry.
    pub fn native_schema(&self) -> Vec<(String, NativeFormat)> {
        let id_format = NativeFormat { ty: NativeType::U8, endian: Endian::Little };
        let mut slots = Vec::new();
        if self.record_id_width >= 1 {
            slots.push((format!("RecordID{}", self.channel_group), id_format));
        }
        for (idx, channel) in self.channels.iter().enumerate() {
            if self.slot_of_channel[idx] == idx {
                slots.push((channel.name.clone(), channel.native));
            }
        }
        if self.record_id_width == 2 {
            slots.push((format!("RecordID{}_2", self.channel_group), id_format));
        }
        slots
    }

    /// Concatenated per-slot format codes of one record, for diagnostics.
    pub fn record_struct_format(&self) -> String {
        self.native_schema()
            .iter()
            .map(|(_, format)| format.struct_code())
            .collect()
    }
}
