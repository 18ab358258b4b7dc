use mdf3_rs::api::mdf::{Mdf, ReadOptions};
use mdf3_rs::error::MdfError;
use mdf3_rs::parsing::decoder::SampleColumn;
use mdf3_rs::parsing::mdf_file::MdfFile;
use mdf3_rs::store::ChannelStore;

fn temp_path(dir: &tempfile::TempDir, name: &str) -> String {
    dir.path().join(name).to_str().unwrap().to_string()
}

fn text_column(values: &[&str]) -> SampleColumn {
    SampleColumn::Text(values.iter().map(|s| s.to_string()).collect())
}

#[test]
fn write_and_read_text_and_float_channels() -> Result<(), MdfError> {
    let dir = tempfile::tempdir()?;
    let path = temp_path(&dir, "s6.dat");

    let mut store = ChannelStore::new();
    store.metadata.author = String::from("bench");
    store.metadata.organisation = String::from("lab");
    store.add_channel(
        0,
        "t",
        SampleColumn::F64(vec![0.0, 1.0, 2.0]),
        Some("t"),
        1,
        "s",
        "time axis",
        None,
    );
    store.add_channel(0, "x", text_column(&["a", "bb", "ccc"]), Some("t"), 1, "", "", None);
    Mdf::from_store(store).write(&path)?;

    // IDBlock bytes: magic and 330 little-endian
    let bytes = std::fs::read(&path)?;
    assert_eq!(&bytes[0..8], b"MDF     ");
    assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 330);

    let reread = Mdf::from_file(&path)?;
    assert_eq!(
        reread.channel_data("t"),
        Some(&SampleColumn::F64(vec![0.0, 1.0, 2.0]))
    );
    assert_eq!(reread.channel_data("x"), Some(&text_column(&["a", "bb", "ccc"])));

    let channels = reread.channels();
    assert_eq!(channels.len(), 2);
    let t = channels.iter().find(|c| c.name() == "t").unwrap();
    assert_eq!(t.unit(), "s");
    assert_eq!(t.description(), "time axis");
    assert_eq!(t.master(), Some("t"));
    let x = channels.iter().find(|c| c.name() == "x").unwrap();
    assert_eq!(x.master(), Some("t"));

    assert_eq!(reread.store().metadata.author, "bench");
    assert_eq!(reread.store().metadata.organisation, "lab");
    Ok(())
}

#[test]
fn numeric_columns_roundtrip_exactly() -> Result<(), MdfError> {
    let dir = tempfile::tempdir()?;
    let path = temp_path(&dir, "numeric.dat");

    let mut store = ChannelStore::new();
    store.add_channel(
        0,
        "time",
        SampleColumn::F64(vec![0.0, 0.25, 0.5, 0.75]),
        Some("time"),
        1,
        "s",
        "",
        None,
    );
    store.add_channel(
        0,
        "counter",
        SampleColumn::U32(vec![7, 8, 9, 4_000_000_000]),
        Some("time"),
        1,
        "",
        "",
        None,
    );
    store.add_channel(
        0,
        "delta",
        SampleColumn::I16(vec![-5, 0, 5, -32768]),
        Some("time"),
        1,
        "K",
        "",
        None,
    );
    store.add_channel(
        0,
        "ratio",
        SampleColumn::F32(vec![0.5, -1.25, 3.75, 0.0]),
        Some("time"),
        1,
        "",
        "",
        None,
    );
    Mdf::from_store(store).write(&path)?;

    let reread = Mdf::from_file(&path)?;
    assert_eq!(
        reread.channel_data("time"),
        Some(&SampleColumn::F64(vec![0.0, 0.25, 0.5, 0.75]))
    );
    assert_eq!(
        reread.channel_data("counter"),
        Some(&SampleColumn::U32(vec![7, 8, 9, 4_000_000_000]))
    );
    assert_eq!(
        reread.channel_data("delta"),
        Some(&SampleColumn::I16(vec![-5, 0, 5, -32768]))
    );
    assert_eq!(
        reread.channel_data("ratio"),
        Some(&SampleColumn::F32(vec![0.5, -1.25, 3.75, 0.0]))
    );

    let delta = reread.channels();
    let delta = delta.iter().find(|c| c.name() == "delta").unwrap();
    assert_eq!(delta.unit(), "K");
    Ok(())
}

#[test]
fn written_block_graph_parses_cleanly() -> Result<(), MdfError> {
    let dir = tempfile::tempdir()?;
    let path = temp_path(&dir, "graph.dat");

    let mut store = ChannelStore::new();
    store.add_channel(
        0,
        "t",
        SampleColumn::F64(vec![0.0, 0.1]),
        Some("t"),
        1,
        "s",
        "",
        None,
    );
    store.add_channel(0, "v", SampleColumn::U8(vec![1, 2]), Some("t"), 1, "", "", None);
    store.add_channel(
        1,
        "t2",
        SampleColumn::F64(vec![0.0]),
        Some("t2"),
        1,
        "s",
        "",
        None,
    );
    store.add_channel(1, "w", SampleColumn::U16(vec![42]), Some("t2"), 1, "", "", None);
    Mdf::from_store(store).write(&path)?;

    let file = MdfFile::parse_from_file(&path)?;
    assert_eq!(file.identification.version_number, 330);
    assert_eq!(file.header.n_data_groups, 2);
    assert_eq!(file.data_groups.len(), 2);

    for data_group in &file.data_groups {
        assert_eq!(data_group.block.n_record_ids, 0);
        assert_eq!(data_group.channel_groups.len(), 1);
    }

    let first_cg = &file.data_groups[0].channel_groups[0];
    assert_eq!(first_cg.block.n_channels, 2);
    assert_eq!(first_cg.block.n_records, 2);
    // f64 master + u8 signal
    assert_eq!(first_cg.block.record_size, 9);

    let names: Vec<_> = first_cg
        .channels
        .iter()
        .map(|channel| channel.name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["t", "v"]);
    // master channel sits first and is flagged as such
    assert_eq!(first_cg.channels[0].channel_type, 1);
    assert_eq!(first_cg.channels[1].channel_type, 0);
    // value range was computed for the data channel
    assert!(first_cg.channels[1].value_range_valid);
    assert_eq!(first_cg.channels[1].min_value, 1.0);
    assert_eq!(first_cg.channels[1].max_value, 2.0);
    Ok(())
}

#[test]
fn channel_filter_restricts_read() -> Result<(), MdfError> {
    let dir = tempfile::tempdir()?;
    let path = temp_path(&dir, "filter.dat");

    let mut store = ChannelStore::new();
    store.add_channel(
        0,
        "t",
        SampleColumn::F64(vec![0.0, 1.0]),
        Some("t"),
        1,
        "s",
        "",
        None,
    );
    store.add_channel(0, "a", SampleColumn::U8(vec![1, 2]), Some("t"), 1, "", "", None);
    store.add_channel(0, "b", SampleColumn::U8(vec![3, 4]), Some("t"), 1, "", "", None);
    Mdf::from_store(store).write(&path)?;

    let options = ReadOptions {
        channel_list: Some(vec![String::from("b")]),
        convert_after_read: true,
    };
    let reread = Mdf::from_file_with(&path, options)?;
    // the selected channel and its master, nothing else
    assert_eq!(reread.channel_data("b"), Some(&SampleColumn::U8(vec![3, 4])));
    assert!(reread.channel_data("t").is_some());
    assert!(reread.channel_data("a").is_none());
    Ok(())
}

#[test]
fn writer_rejects_byte_array_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_path(&dir, "bytes.dat");

    let mut store = ChannelStore::new();
    store.add_channel(
        0,
        "blob",
        SampleColumn::Bytes(vec![vec![1, 2], vec![3, 4]]),
        Some("blob"),
        1,
        "",
        "",
        None,
    );
    match Mdf::from_store(store).write(&path) {
        Err(MdfError::UnsupportedDtype { channel, .. }) => assert_eq!(channel, "blob"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn metadata_json_lists_channels() -> Result<(), MdfError> {
    let mut store = ChannelStore::new();
    store.metadata.project = String::from("endurance");
    store.add_channel(
        0,
        "t",
        SampleColumn::F64(vec![0.0]),
        Some("t"),
        1,
        "s",
        "",
        None,
    );
    let mdf = Mdf::from_store(store);
    let json = mdf.metadata_json()?;
    assert!(json.contains("endurance"));
    assert!(json.contains("\"t\""));
    Ok(())
}
