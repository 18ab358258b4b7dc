// Emission of the block graph and the interleaved record stream
use std::io::{Seek, Write};

use chrono::{Local, Utc};
use log::debug;

use crate::blocks::channel_block::ChannelBlock;
use crate::blocks::channel_group_block::ChannelGroupBlock;
use crate::blocks::common::{Endian, latin1_exact};
use crate::blocks::conversion::ConversionBlock;
use crate::blocks::data_group_block::DataGroupBlock;
use crate::blocks::header_block::HeaderBlock;
use crate::blocks::identification_block::IdentificationBlock;
use crate::blocks::text_block::TextBlock;
use crate::error::MdfError;
use crate::parsing::decoder::SampleColumn;
use crate::parsing::record_layout::{NativeFormat, NativeType};
use crate::store::{ChannelEntry, ChannelStore};

use super::MdfWriter;

// Offsets of the link slots patched once the referenced block is placed.
const HD_FIRST_DG: u64 = 4;
const DG_NEXT: u64 = 4;
const DG_FIRST_CG: u64 = 8;
const DG_DATA: u64 = 16;
const CG_FIRST_CN: u64 = 8;
const CG_RECORD_SIZE: u64 = 20;
const CN_NEXT: u64 = 4;
const CN_CONVERSION: u64 = 8;
const CN_LONG_NAME: u64 = 218;

/// Per-channel write plan: column reference plus the derived CN fields.
struct ChannelPlan<'a> {
    name: &'a str,
    entry: &'a ChannelEntry,
    bits: u16,
    data_type: u16,
    text_width: usize,
    range: Option<(f64, f64)>,
}

impl<'a> ChannelPlan<'a> {
    fn new(name: &'a str, entry: &'a ChannelEntry) -> Result<Self, MdfError> {
        let column = &entry.data;
        let (bits, data_type, text_width) = match column {
            SampleColumn::U8(_) => (8, 0, 0),
            SampleColumn::U16(_) => (16, 0, 0),
            SampleColumn::U32(_) => (32, 0, 0),
            SampleColumn::U64(_) => (64, 0, 0),
            SampleColumn::I8(_) => (8, 1, 0),
            SampleColumn::I16(_) => (16, 1, 0),
            SampleColumn::I32(_) => (32, 1, 0),
            SampleColumn::I64(_) => (64, 1, 0),
            SampleColumn::F32(_) => (32, 2, 0),
            SampleColumn::F64(_) => (64, 3, 0),
            SampleColumn::Text(values) => {
                let width = values
                    .iter()
                    .map(|value| latin1_exact(value).len())
                    .max()
                    .unwrap_or(0)
                    .max(1);
                ((width * 8) as u16, 7, width)
            }
            SampleColumn::Bytes(_) => {
                return Err(MdfError::UnsupportedDtype {
                    channel: name.to_string(),
                    dtype: column.dtype().to_string(),
                });
            }
        };

        let range = column.as_f64_vec().map(|values| {
            let mut min = 0.0f64;
            let mut max = 0.0f64;
            for (index, &value) in values.iter().enumerate() {
                if index == 0 {
                    min = value;
                    max = value;
                } else {
                    min = min.min(value);
                    max = max.max(value);
                }
            }
            (min, max)
        });

        Ok(Self { name, entry, bits, data_type, text_width, range })
    }

    fn struct_code(&self) -> String {
        let ty = match &self.entry.data {
            SampleColumn::U8(_) => NativeType::U8,
            SampleColumn::U16(_) => NativeType::U16,
            SampleColumn::U32(_) => NativeType::U32,
            SampleColumn::U64(_) => NativeType::U64,
            SampleColumn::I8(_) => NativeType::I8,
            SampleColumn::I16(_) => NativeType::I16,
            SampleColumn::I32(_) => NativeType::I32,
            SampleColumn::I64(_) => NativeType::I64,
            SampleColumn::F32(_) => NativeType::F32,
            SampleColumn::F64(_) => NativeType::F64,
            SampleColumn::Text(_) | SampleColumn::Bytes(_) => {
                NativeType::Text(self.text_width as u16)
            }
        };
        NativeFormat { ty, endian: Endian::Little }.struct_code()
    }

    /// Appends record `index` of this channel to the record buffer.
    fn write_sample(&self, index: usize, out: &mut Vec<u8>) {
        match &self.entry.data {
            SampleColumn::U8(v) => out.push(v[index]),
            SampleColumn::U16(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::U32(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::U64(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::I8(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::I16(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::I32(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::I64(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::F32(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::F64(v) => out.extend_from_slice(&v[index].to_le_bytes()),
            SampleColumn::Text(v) => {
                let mut bytes = latin1_exact(&v[index]);
                bytes.truncate(self.text_width);
                bytes.resize(self.text_width, 0);
                out.extend_from_slice(&bytes);
            }
            SampleColumn::Bytes(_) => unreachable!("rejected when planning"),
        }
    }
}

impl<W: Write + Seek> MdfWriter<W> {
    /// Writes the whole container as one sorted MDF 3.30 file.
    ///
    /// Per data group the stream is `DG -> CG -> CN* -> DATA`, with each
    /// CN followed by its long-name TXBlock and its CCBlock. The master
    /// channel is moved to the front of its group.
    pub fn write_store(&mut self, store: &ChannelStore) -> Result<(), MdfError> {
        self.write_bytes(&IdentificationBlock::default().to_bytes()?)?;

        let now = Local::now();
        let mut header = HeaderBlock::default();
        header.n_data_groups = store.master_groups().len() as u16;
        header.date = now.format("%d:%m:%Y").to_string();
        header.time = now.format("%H:%M:%S").to_string();
        header.author = store.metadata.author.clone();
        header.organization = store.metadata.organisation.clone();
        header.project = store.metadata.project.clone();
        header.subject = store.metadata.subject.clone();
        header.timestamp_ns = Utc::now().timestamp_nanos_opt().unwrap_or(0) as u64;
        let hd_pos = self.write_bytes(&header.to_bytes()?)?;

        let mut next_dg_slot = hd_pos + HD_FIRST_DG;
        for (master_key, members) in store.master_groups() {
            // master first, remaining channels in name order
            let mut names: Vec<&str> = members.iter().map(String::as_str).collect();
            names.sort_unstable();
            if let Some(position) = names.iter().position(|name| *name == master_key.as_str()) {
                let master = names.remove(position);
                names.insert(0, master);
            }

            let mut plans = Vec::with_capacity(names.len());
            for name in &names {
                let entry = store.get(name).ok_or_else(|| {
                    MdfError::BlockSerializationError(format!(
                        "channel '{name}' missing from container"
                    ))
                })?;
                plans.push(ChannelPlan::new(name, entry)?);
            }
            if plans.is_empty() {
                continue;
            }

            let n_records = plans[0].entry.data.len();
            for plan in &plans {
                if plan.entry.data.len() != n_records {
                    return Err(MdfError::BlockSerializationError(format!(
                        "channel '{}' has {} samples, the group holds {} records",
                        plan.name,
                        plan.entry.data.len(),
                        n_records
                    )));
                }
            }

            // mean master increment; 0 for text masters and singletons
            let sampling = plans[0]
                .entry
                .data
                .as_f64_vec()
                .filter(|values| values.len() > 1)
                .map(|values| {
                    values.windows(2).map(|pair| pair[1] - pair[0]).sum::<f64>()
                        / (values.len() - 1) as f64
                })
                .unwrap_or(0.0);

            let dg_pos = self.offset();
            self.write_pointer(next_dg_slot, dg_pos as u32)?;
            self.write_bytes(&DataGroupBlock::default().to_bytes()?)?;
            next_dg_slot = dg_pos + DG_NEXT;

            let cg_pos = self.offset();
            self.write_pointer(dg_pos + DG_FIRST_CG, cg_pos as u32)?;
            let mut cg_block = ChannelGroupBlock::default();
            cg_block.n_channels = plans.len() as u16;
            cg_block.n_records = n_records as u32;
            self.write_bytes(&cg_block.to_bytes()?)?;

            let mut bit_position: u32 = 0;
            let mut record_format = String::new();
            let mut prev_cn_next_slot = cg_pos + CG_FIRST_CN;
            for plan in &plans {
                let cn_pos = self.offset();
                self.write_pointer(prev_cn_next_slot, cn_pos as u32)?;

                let mut cn_block = ChannelBlock::default();
                cn_block.channel_type = u16::from(store.is_master(plan.name));
                cn_block.short_name = plan.name.to_string();
                cn_block.description = plan.entry.description.clone();
                cn_block.start_bit = bit_position as u16;
                cn_block.bit_count = plan.bits;
                cn_block.signal_data_type = plan.data_type;
                if let Some((min, max)) = plan.range {
                    cn_block.value_range_valid = true;
                    cn_block.min_value = min;
                    cn_block.max_value = max;
                }
                cn_block.sampling_rate = sampling;
                self.write_bytes(&cn_block.to_bytes()?)?;
                // the last channel keeps nextCN = 0
                prev_cn_next_slot = cn_pos + CN_NEXT;

                let tx_pos = self.offset();
                self.write_bytes(&TextBlock::new(plan.name).to_bytes()?)?;
                self.write_pointer(cn_pos + CN_LONG_NAME, tx_pos as u32)?;

                let cc_pos = self.offset();
                let (range_valid, min, max) = match plan.range {
                    Some((min, max)) => (true, min, max),
                    None => (false, 0.0, 0.0),
                };
                let cc_block = ConversionBlock::physical(range_valid, min, max, &plan.entry.unit);
                self.write_bytes(&cc_block.to_bytes()?)?;
                self.write_pointer(cn_pos + CN_CONVERSION, cc_pos as u32)?;

                bit_position += plan.bits as u32;
                record_format.push_str(&plan.struct_code());
            }

            let record_size = (bit_position / 8) as usize;
            self.write_u16_at(cg_pos + CG_RECORD_SIZE, record_size as u16)?;

            let data_pos = self.offset();
            self.write_pointer(dg_pos + DG_DATA, data_pos as u32)?;
            debug!("record format {record_format} for {n_records} records of {record_size} bytes");

            let mut records = Vec::with_capacity(record_size * n_records);
            for index in 0..n_records {
                for plan in &plans {
                    plan.write_sample(index, &mut records);
                }
            }
            self.write_bytes(&records)?;
        }

        Ok(())
    }
}
