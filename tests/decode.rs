use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use mdf3_rs::blocks::channel_block::ChannelBlock;
use mdf3_rs::blocks::common::Endian;
use mdf3_rs::error::MdfError;
use mdf3_rs::parsing::decoder::{SampleColumn, read_sorted_block, read_unsorted_block, repack_bits};
use mdf3_rs::parsing::record_layout::{
    ChannelDescriptor, RecordSchema, native_format, struct_format,
};

fn descriptor(
    name: &str,
    signal_type: u16,
    bit_count: u16,
    start_bit: u16,
    channel_type: u16,
    record_id_width: u16,
    file_order: Endian,
) -> ChannelDescriptor {
    let mut block = ChannelBlock::default();
    block.name = Some(name.to_string());
    block.signal_data_type = signal_type;
    block.bit_count = bit_count;
    block.start_bit = start_bit;
    block.channel_type = channel_type;
    ChannelDescriptor::from_block(&block, record_id_width, file_order).unwrap()
}

fn schema(
    record_id: u16,
    record_id_width: u16,
    record_length: usize,
    n_records: usize,
    channels: Vec<ChannelDescriptor>,
) -> RecordSchema {
    RecordSchema::build(0, 0, record_id, record_id_width, record_length, n_records, channels)
        .unwrap()
}

#[test]
fn type_encoder_widens_and_orders() {
    assert_eq!(struct_format(0, 24, Endian::Little).unwrap(), "<I");
    assert_eq!(struct_format(0, 24, Endian::Big).unwrap(), ">I");
    assert_eq!(struct_format(9, 16, Endian::Little).unwrap(), ">H");
    assert_eq!(struct_format(14, 8, Endian::Big).unwrap(), "<b");
    assert_eq!(struct_format(3, 64, Endian::Little).unwrap(), "<d");
    assert_eq!(struct_format(7, 32, Endian::Little).unwrap(), "4s");

    assert!(matches!(
        native_format(0, 65, Endian::Little),
        Err(MdfError::SchemaError { .. })
    ));
    assert!(matches!(
        native_format(2, 16, Endian::Little),
        Err(MdfError::SchemaError { .. })
    ));
    assert!(matches!(
        native_format(4, 8, Endian::Little),
        Err(MdfError::SchemaError { .. })
    ));
}

#[test]
fn sorted_aligned_block_decodes_fast() -> Result<(), MdfError> {
    // master t: uint32 LE, signal v: float32 LE, 3 records
    let channels = vec![
        descriptor("t", 0, 32, 0, 1, 0, Endian::Little),
        descriptor("v", 2, 32, 32, 0, 0, Endian::Little),
    ];
    let schema = schema(0, 0, 8, 3, channels);
    assert!(schema.byte_aligned);
    assert!(!schema.hidden_bytes);
    assert_eq!(schema.master_name(), Some("t"));
    assert_eq!(schema.record_struct_format(), "<I<f");

    let bytes: Vec<u8> = vec![
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x3F, // 0, 1.0
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x40, // 1, 2.5
        0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x40, // 2, 4.0
    ];
    let mut cursor = Cursor::new(&bytes[..]);
    let columns = read_sorted_block(&mut cursor, 0, &schema, None)?;

    for column in columns.iter().flatten() {
        assert_eq!(column.len(), schema.number_of_records);
    }
    assert_eq!(columns[0], Some(SampleColumn::U32(vec![0, 1, 2])));
    assert_eq!(columns[1], Some(SampleColumn::F32(vec![1.0, 2.5, 4.0])));
    Ok(())
}

#[test]
fn bit_packed_channels_share_one_byte() -> Result<(), MdfError> {
    // three fields of 3, 2 and 3 bits inside a single byte
    let channels = vec![
        descriptor("a", 0, 3, 0, 0, 0, Endian::Little),
        descriptor("b", 0, 2, 3, 0, 0, Endian::Little),
        descriptor("c", 0, 3, 5, 0, 0, Endian::Little),
    ];
    let schema = schema(0, 0, 1, 1, channels);
    assert!(schema.byte_aligned);
    assert_eq!(schema.slot_of_channel, vec![0, 0, 0]);
    assert_eq!(schema.record_length, 1);
    assert_eq!(schema.native_schema().len(), 1);

    let bytes = [0b1011_0101u8];
    let mut cursor = Cursor::new(&bytes[..]);
    let columns = read_sorted_block(&mut cursor, 0, &schema, None)?;

    let mut values = Vec::new();
    for (idx, channel) in schema.channels.iter().enumerate() {
        let mut column = columns[idx].clone().unwrap();
        repack_bits(&mut column, channel);
        match column {
            SampleColumn::U8(v) => values.push(v[0]),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(values, vec![5, 2, 5]);
    Ok(())
}

#[test]
fn repack_keeps_values_in_range() {
    let channel = descriptor("a", 13, 5, 3, 0, 0, Endian::Little);
    let mut column = SampleColumn::U8(vec![0xFF, 0b1010_1000, 0x00]);
    repack_bits(&mut column, &channel);
    match column {
        SampleColumn::U8(values) => {
            for value in values {
                assert!(u32::from(value) < (1 << 5));
            }
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn hidden_bytes_are_skipped() -> Result<(), MdfError> {
    // 8-byte records, only a uint16 at offset 0 declared
    let channels = vec![descriptor("n", 0, 16, 0, 0, 0, Endian::Little)];
    let schema = schema(0, 0, 8, 2, channels);
    assert!(schema.hidden_bytes);

    let mut bytes = vec![0u8; 16];
    bytes[0..2].copy_from_slice(&0x0102u16.to_le_bytes());
    bytes[8..10].copy_from_slice(&0x0304u16.to_le_bytes());
    // poison the undeclared tail to prove it is ignored
    for byte in bytes[2..8].iter_mut() {
        *byte = 0xEE;
    }

    let mut cursor = Cursor::new(&bytes[..]);
    let columns = read_sorted_block(&mut cursor, 0, &schema, None)?;
    assert_eq!(columns[0], Some(SampleColumn::U16(vec![0x0102, 0x0304])));
    Ok(())
}

#[test]
fn sorted_block_honors_channel_filter() -> Result<(), MdfError> {
    let channels = vec![
        descriptor("t", 0, 8, 0, 1, 0, Endian::Little),
        descriptor("u", 0, 8, 8, 0, 0, Endian::Little),
        descriptor("v", 0, 8, 16, 0, 0, Endian::Little),
    ];
    let schema = schema(0, 0, 3, 2, channels);
    let bytes = [1u8, 2, 3, 4, 5, 6];
    let mut cursor = Cursor::new(&bytes[..]);
    let wanted: HashSet<String> = ["v".to_string()].into_iter().collect();
    let columns = read_sorted_block(&mut cursor, 0, &schema, Some(&wanted))?;

    // master rides along, unrequested channels stay undecoded
    assert_eq!(columns[0], Some(SampleColumn::U8(vec![1, 4])));
    assert_eq!(columns[1], None);
    assert_eq!(columns[2], Some(SampleColumn::U8(vec![3, 6])));
    Ok(())
}

#[test]
fn sorted_block_reports_truncation() {
    let channels = vec![descriptor("t", 0, 32, 0, 1, 0, Endian::Little)];
    let schema = schema(0, 0, 4, 4, channels);
    let bytes = [0u8; 10]; // 2.5 records instead of 4
    let mut cursor = Cursor::new(&bytes[..]);
    match read_sorted_block(&mut cursor, 0, &schema, None) {
        Err(MdfError::DecodeError { record_index, channel, .. }) => {
            assert_eq!(record_index, 2);
            assert_eq!(channel, "t");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn big_endian_fields_decode_to_native() -> Result<(), MdfError> {
    // type 9 is big-endian regardless of the file order
    let channels = vec![descriptor("n", 9, 16, 0, 0, 0, Endian::Little)];
    let schema = schema(0, 0, 2, 2, channels);
    let bytes = [0x12u8, 0x34, 0xAB, 0xCD];
    let mut cursor = Cursor::new(&bytes[..]);
    let columns = read_sorted_block(&mut cursor, 0, &schema, None)?;
    assert_eq!(columns[0], Some(SampleColumn::U16(vec![0x1234, 0xABCD])));
    Ok(())
}

#[test]
fn file_byte_order_applies_to_default_types() -> Result<(), MdfError> {
    let channels = vec![descriptor("n", 0, 16, 0, 0, 0, Endian::Big)];
    let schema = schema(0, 0, 2, 1, channels);
    let bytes = [0x12u8, 0x34];
    let mut cursor = Cursor::new(&bytes[..]);
    let columns = read_sorted_block(&mut cursor, 0, &schema, None)?;
    assert_eq!(columns[0], Some(SampleColumn::U16(vec![0x1234])));
    Ok(())
}

#[test]
fn schema_rejects_field_outside_record() {
    let channels = vec![descriptor("n", 0, 32, 16, 0, 0, Endian::Little)];
    match RecordSchema::build(0, 0, 0, 0, 4, 1, channels) {
        Err(MdfError::SchemaError { channel, .. }) => assert_eq!(channel, "n"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn straddling_channel_clears_byte_alignment() {
    // 12 bits starting at bit 4 run across the first channel's byte boundary
    let channels = vec![
        descriptor("a", 0, 4, 0, 0, 0, Endian::Little),
        descriptor("b", 0, 12, 4, 0, 0, Endian::Little),
    ];
    let schema = schema(0, 0, 2, 1, channels);
    assert!(!schema.byte_aligned);
}

#[test]
fn unsorted_block_demultiplexes_by_record_id() -> Result<(), MdfError> {
    // S4: IDs 1 (uint8) and 2 (uint16 LE) interleaved
    let first = schema(1, 1, 1, 2, vec![descriptor("a", 0, 8, 0, 1, 1, Endian::Little)]);
    let second = schema(2, 1, 2, 1, vec![descriptor("b", 0, 16, 0, 1, 1, Endian::Little)]);
    let mut schemas = HashMap::new();
    schemas.insert(1u8, first);
    schemas.insert(2u8, second);

    let bytes = [0x01u8, 0xAA, 0x02, 0x34, 0x12, 0x01, 0xBB];
    let mut cursor = Cursor::new(&bytes[..]);
    let decoded = read_unsorted_block(&mut cursor, 0, bytes.len(), &schemas, None)?;

    assert_eq!(decoded[&1][0], Some(SampleColumn::U8(vec![0xAA, 0xBB])));
    assert_eq!(decoded[&2][0], Some(SampleColumn::U16(vec![0x1234])));
    Ok(())
}

#[test]
fn unsorted_block_rejects_unknown_id() {
    let only = schema(1, 1, 1, 1, vec![descriptor("a", 0, 8, 0, 1, 1, Endian::Little)]);
    let mut schemas = HashMap::new();
    schemas.insert(1u8, only);

    let bytes = [0x07u8, 0xAA];
    let mut cursor = Cursor::new(&bytes[..]);
    match read_unsorted_block(&mut cursor, 0, bytes.len(), &schemas, None) {
        Err(MdfError::UnknownRecordID(7)) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn unsorted_block_consumes_trailing_id_byte() -> Result<(), MdfError> {
    // record_id_width 2: every record carries the ID in front and behind
    let only = schema(5, 2, 1, 2, vec![descriptor("a", 0, 8, 0, 1, 2, Endian::Little)]);
    let mut schemas = HashMap::new();
    schemas.insert(5u8, only);

    let bytes = [0x05u8, 0x11, 0x05, 0x05, 0x22, 0x05];
    let mut cursor = Cursor::new(&bytes[..]);
    let decoded = read_unsorted_block(&mut cursor, 0, bytes.len(), &schemas, None)?;
    assert_eq!(decoded[&5][0], Some(SampleColumn::U8(vec![0x11, 0x22])));
    Ok(())
}

#[test]
fn output_preserves_record_order() -> Result<(), MdfError> {
    let channels = vec![descriptor("t", 0, 8, 0, 1, 0, Endian::Little)];
    let schema = schema(0, 0, 1, 5, channels);
    let bytes = [9u8, 3, 7, 1, 5];
    let mut cursor = Cursor::new(&bytes[..]);
    let columns = read_sorted_block(&mut cursor, 0, &schema, None)?;
    assert_eq!(columns[0], Some(SampleColumn::U8(vec![9, 3, 7, 1, 5])));
    Ok(())
}
