use mdf3_rs::blocks::channel_block::ChannelBlock;
use mdf3_rs::blocks::channel_group_block::ChannelGroupBlock;
use mdf3_rs::blocks::common::{BlockParse, Endian};
use mdf3_rs::blocks::conversion::{Conversion, ConversionBlock};
use mdf3_rs::blocks::data_group_block::DataGroupBlock;
use mdf3_rs::blocks::header_block::HeaderBlock;
use mdf3_rs::blocks::identification_block::IdentificationBlock;
use mdf3_rs::blocks::text_block::TextBlock;
use mdf3_rs::error::MdfError;

#[test]
fn identification_block_roundtrip() -> Result<(), MdfError> {
    let id_block = IdentificationBlock::default();
    let bytes = id_block.to_bytes()?;
    assert_eq!(bytes.len(), 64);
    assert_eq!(&bytes[0..8], b"MDF     ");
    assert_eq!(&bytes[8..16], b"3.30    ");
    assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 330);

    let parsed = IdentificationBlock::from_bytes(&bytes)?;
    assert_eq!(parsed.version_number, 330);
    assert_eq!(parsed.byte_order, Endian::Little);
    assert_eq!(parsed.code_page, 28591);
    Ok(())
}

#[test]
fn identification_block_rejects_wrong_magic() {
    let mut bytes = IdentificationBlock::default().to_bytes().unwrap();
    bytes[0] = b'X';
    match IdentificationBlock::from_bytes(&bytes) {
        Err(MdfError::FileIdentifierError(_)) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn identification_block_rejects_mdf4() {
    let mut bytes = IdentificationBlock::default().to_bytes().unwrap();
    bytes[28..30].copy_from_slice(&410u16.to_le_bytes());
    match IdentificationBlock::from_bytes(&bytes) {
        Err(MdfError::FileVersioningError(410)) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn header_block_roundtrip() -> Result<(), MdfError> {
    let mut hd = HeaderBlock::default();
    hd.first_dg_addr = 272;
    hd.n_data_groups = 2;
    hd.date = String::from("24:12:2025");
    hd.time = String::from("13:37:00");
    hd.author = String::from("test bench");
    hd.timestamp_ns = 123_456_789;
    let bytes = hd.to_bytes()?;
    assert_eq!(bytes.len(), 208);

    let parsed = HeaderBlock::from_bytes(&bytes, Endian::Little)?;
    assert_eq!(parsed.header.id, "HD");
    assert_eq!(parsed.first_dg_addr, 272);
    assert_eq!(parsed.n_data_groups, 2);
    assert_eq!(parsed.date, "24:12:2025");
    assert_eq!(parsed.time, "13:37:00");
    assert_eq!(parsed.author, "test bench");
    assert_eq!(parsed.timestamp_ns, 123_456_789);
    assert_eq!(parsed.utc_offset, 1);
    Ok(())
}

#[test]
fn header_block_short_form_parses() -> Result<(), MdfError> {
    // 3.0 files stop after the subject field
    let mut bytes = HeaderBlock::default().to_bytes()?;
    bytes.truncate(164);
    bytes[2..4].copy_from_slice(&164u16.to_le_bytes());
    let parsed = HeaderBlock::from_bytes(&bytes, Endian::Little)?;
    assert_eq!(parsed.timestamp_ns, 0);
    assert_eq!(parsed.timer_id, "");
    Ok(())
}

#[test]
fn text_block_roundtrip() -> Result<(), MdfError> {
    let tx = TextBlock::new("hello");
    let bytes = tx.to_bytes()?;
    assert_eq!(bytes.len(), 4 + 5 + 1);
    let parsed = TextBlock::from_bytes(&bytes, Endian::Little)?;
    assert_eq!(parsed.text, "hello");
    Ok(())
}

#[test]
fn data_group_block_roundtrip() -> Result<(), MdfError> {
    let mut dg = DataGroupBlock::default();
    dg.first_cg_addr = 0x1234;
    dg.data_addr = 0x5678;
    let bytes = dg.to_bytes()?;
    assert_eq!(bytes.len(), 28);
    let parsed = DataGroupBlock::from_bytes(&bytes, Endian::Little)?;
    assert_eq!(parsed.first_cg_addr, 0x1234);
    assert_eq!(parsed.data_addr, 0x5678);
    assert_eq!(parsed.n_channel_groups, 1);
    assert_eq!(parsed.n_record_ids, 0);
    Ok(())
}

#[test]
fn channel_group_block_roundtrip() -> Result<(), MdfError> {
    let mut cg = ChannelGroupBlock::default();
    cg.record_id = 3;
    cg.n_channels = 4;
    cg.record_size = 12;
    cg.n_records = 1000;
    let bytes = cg.to_bytes()?;
    assert_eq!(bytes.len(), 30);
    let parsed = ChannelGroupBlock::from_bytes(&bytes, Endian::Little)?;
    assert_eq!(parsed.record_id, 3);
    assert_eq!(parsed.n_channels, 4);
    assert_eq!(parsed.record_size, 12);
    assert_eq!(parsed.n_records, 1000);
    Ok(())
}

#[test]
fn channel_block_roundtrip() -> Result<(), MdfError> {
    let mut cn = ChannelBlock::default();
    cn.channel_type = 1;
    cn.short_name = String::from("time");
    cn.description = String::from("acquisition time");
    cn.start_bit = 32;
    cn.bit_count = 64;
    cn.signal_data_type = 3;
    cn.value_range_valid = true;
    cn.min_value = 0.0;
    cn.max_value = 59.5;
    cn.sampling_rate = 0.01;
    let bytes = cn.to_bytes()?;
    assert_eq!(bytes.len(), 228);
    let parsed = ChannelBlock::from_bytes(&bytes, Endian::Little)?;
    assert_eq!(parsed.channel_type, 1);
    assert_eq!(parsed.short_name, "time");
    assert_eq!(parsed.description, "acquisition time");
    assert_eq!(parsed.start_bit, 32);
    assert_eq!(parsed.bit_count, 64);
    assert_eq!(parsed.signal_data_type, 3);
    assert!(parsed.value_range_valid);
    assert_eq!(parsed.max_value, 59.5);
    assert_eq!(parsed.sampling_rate, 0.01);
    Ok(())
}

#[test]
fn channel_block_truncates_long_short_name() -> Result<(), MdfError> {
    let mut cn = ChannelBlock::default();
    cn.short_name = "x".repeat(50);
    let bytes = cn.to_bytes()?;
    assert_eq!(bytes.len(), 228);
    let parsed = ChannelBlock::from_bytes(&bytes, Endian::Little)?;
    assert_eq!(parsed.short_name.len(), 31);
    Ok(())
}

#[test]
fn conversion_block_physical_roundtrip() -> Result<(), MdfError> {
    let cc = ConversionBlock::physical(true, -1.5, 99.0, "rpm");
    let bytes = cc.to_bytes()?;
    assert_eq!(bytes.len(), 46);
    assert_eq!(u16::from_le_bytes([bytes[42], bytes[43]]), 65535);

    let parsed = ConversionBlock::from_bytes(&bytes, Endian::Little, &bytes)?;
    assert!(parsed.range_valid);
    assert_eq!(parsed.min_value, -1.5);
    assert_eq!(parsed.max_value, 99.0);
    assert_eq!(parsed.unit, "rpm");
    assert!(parsed.conversion.is_identity());
    Ok(())
}

fn conversion_prefix(cc_type: u16, size_info: u16, param_bytes: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"CC");
    bytes.extend_from_slice(&((46 + param_bytes) as u16).to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes()); // no physical range
    bytes.extend_from_slice(&0f64.to_le_bytes());
    bytes.extend_from_slice(&0f64.to_le_bytes());
    let mut unit = b"V".to_vec();
    unit.resize(20, 0);
    bytes.extend_from_slice(&unit);
    bytes.extend_from_slice(&cc_type.to_le_bytes());
    bytes.extend_from_slice(&size_info.to_le_bytes());
    bytes
}

#[test]
fn conversion_block_linear_parse() -> Result<(), MdfError> {
    let mut bytes = conversion_prefix(0, 2, 16);
    bytes.extend_from_slice(&(-5.0f64).to_le_bytes());
    bytes.extend_from_slice(&0.5f64.to_le_bytes());
    let parsed = ConversionBlock::from_bytes(&bytes, Endian::Little, &bytes)?;
    assert_eq!(parsed.unit, "V");
    assert_eq!(parsed.conversion, Conversion::Linear { p1: -5.0, p2: 0.5 });
    Ok(())
}

#[test]
fn conversion_block_tab_parse() -> Result<(), MdfError> {
    let mut bytes = conversion_prefix(1, 2, 32);
    for value in [0.0f64, 10.0, 100.0, 20.0] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    let parsed = ConversionBlock::from_bytes(&bytes, Endian::Little, &bytes)?;
    assert_eq!(
        parsed.conversion,
        Conversion::TabInterp { table: vec![(0.0, 10.0), (100.0, 20.0)] }
    );
    Ok(())
}

#[test]
fn conversion_block_text_range_resolves_links() -> Result<(), MdfError> {
    // file image: filler (a real file starts with the IDBlock), two
    // TXBlocks, then the CCBlock referencing them
    let mut file = vec![0u8; 64];
    let default_addr = file.len() as u32;
    file.extend_from_slice(&TextBlock::new("default").to_bytes()?);
    let low_addr = file.len() as u32;
    file.extend_from_slice(&TextBlock::new("low").to_bytes()?);

    let mut cc = conversion_prefix(12, 2, 40);
    for (lower, upper, addr) in [(0.0f64, 0.0f64, default_addr), (1.0, 5.0, low_addr)] {
        cc.extend_from_slice(&lower.to_le_bytes());
        cc.extend_from_slice(&upper.to_le_bytes());
        cc.extend_from_slice(&addr.to_le_bytes());
    }
    let cc_addr = file.len();
    file.extend_from_slice(&cc);

    let parsed = ConversionBlock::from_bytes(&file[cc_addr..], Endian::Little, &file)?;
    match parsed.conversion {
        Conversion::TextRangeTable { ranges } => {
            assert_eq!(ranges.len(), 2);
            assert_eq!(ranges[0].text, "default");
            assert_eq!(ranges[1].text, "low");
            assert_eq!(ranges[1].lower, 1.0);
            assert_eq!(ranges[1].upper, 5.0);
        }
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn conversion_block_unknown_type_is_identity() -> Result<(), MdfError> {
    let bytes = conversion_prefix(11, 0, 0);
    let parsed = ConversionBlock::from_bytes(&bytes, Endian::Little, &bytes)?;
    assert!(parsed.conversion.is_identity());
    Ok(())
}
