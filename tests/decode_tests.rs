//! End-to-end decode tests against hand-built XDF byte streams, mirroring
//! the scenarios in the specification's testable-properties section.

use std::io::Cursor;

use xdf::{load, load_path, ChannelFormat, TimeSeries, XdfOptions};

fn varint(n: u64) -> Vec<u8> {
    if n <= u8::MAX as u64 {
        vec![1, n as u8]
    } else if n <= u32::MAX as u64 {
        let mut v = vec![4u8];
        v.extend_from_slice(&(n as u32).to_le_bytes());
        v
    } else {
        let mut v = vec![8u8];
        v.extend_from_slice(&n.to_le_bytes());
        v
    }
}

fn chunk(tag: u16, mut payload: Vec<u8>) -> Vec<u8> {
    let mut body = tag.to_le_bytes().to_vec();
    body.append(&mut payload);
    let mut out = varint(body.len() as u64);
    out.extend_from_slice(&body);
    out
}

fn stream_header_payload(id: u32, name: &str, nchns: u32, srate: f64, fmt: &str) -> Vec<u8> {
    let xml = format!(
        "<info><name>{name}</name><type>Test</type><channel_count>{nchns}</channel_count>\
         <nominal_srate>{srate}</nominal_srate><channel_format>{fmt}</channel_format></info>"
    );
    let mut payload = id.to_le_bytes().to_vec();
    payload.extend_from_slice(xml.as_bytes());
    payload
}

fn samples_numeric_payload(id: u32, first_stamp: f64, values: &[f64]) -> Vec<u8> {
    let mut payload = id.to_le_bytes().to_vec();
    payload.extend(varint(values.len() as u64));
    for (i, &v) in values.iter().enumerate() {
        if i == 0 {
            payload.push(1);
            payload.extend_from_slice(&first_stamp.to_le_bytes());
        } else {
            payload.push(0);
        }
        payload.extend_from_slice(&v.to_le_bytes());
    }
    payload
}

fn clock_offset_payload(id: u32, collection_time: f64, offset_value: f64) -> Vec<u8> {
    let mut payload = id.to_le_bytes().to_vec();
    payload.extend_from_slice(&collection_time.to_le_bytes());
    payload.extend_from_slice(&offset_value.to_le_bytes());
    payload
}

#[test]
fn file_header_and_multi_stream_roundtrip() {
    let mut data = b"XDF:".to_vec();

    let file_header_xml = b"<info><version>1.0</version></info>".to_vec();
    data.extend(chunk(1, file_header_xml));

    data.extend(chunk(2, stream_header_payload(1, "EEG", 2, 100.0, "double64")));
    data.extend(chunk(2, stream_header_payload(2, "Markers", 1, 0.0, "string")));

    let mut samples1 = 1u32.to_le_bytes().to_vec();
    samples1.extend(varint(3));
    for (i, stamp) in [0.0, 0.01, 0.02].into_iter().enumerate() {
        samples1.push(1);
        samples1.extend_from_slice(&stamp.to_le_bytes());
        samples1.extend_from_slice(&(i as f64).to_le_bytes());
        samples1.extend_from_slice(&(i as f64 * 2.0).to_le_bytes());
    }
    data.extend(chunk(3, samples1));

    let mut samples2 = 2u32.to_le_bytes().to_vec();
    samples2.extend(varint(1));
    samples2.push(1);
    samples2.extend_from_slice(&0.015f64.to_le_bytes());
    let label = b"event_a";
    samples2.extend(varint(label.len() as u64));
    samples2.extend_from_slice(label);
    data.extend(chunk(3, samples2));

    let mut options = XdfOptions::default();
    options.synchronize_clocks = false;
    let loaded = load(Cursor::new(data), options).unwrap();

    assert_eq!(loaded.file_header.fields.get("version").map(String::as_str), Some("1.0"));
    assert_eq!(loaded.streams.len(), 2);

    let eeg = &loaded.streams[0];
    assert_eq!(eeg.info.name, "EEG");
    assert_eq!(eeg.time_stamps.len(), eeg.time_series.rows());
    match &eeg.time_series {
        TimeSeries::Numeric(mat) => assert_eq!(mat.shape(), &[3, 2]),
        _ => panic!("expected numeric series"),
    }

    let markers = &loaded.streams[1];
    assert_eq!(markers.info.channel_format, ChannelFormat::String);
    match &markers.time_series {
        TimeSeries::String(rows) => assert_eq!(rows, &vec![vec!["event_a".to_string()]]),
        _ => panic!("expected string series"),
    }
}

#[test]
fn clock_offsets_shift_timestamps() {
    let mut data = b"XDF:".to_vec();
    data.extend(chunk(2, stream_header_payload(1, "EEG", 1, 10.0, "double64")));

    for i in 0..10 {
        data.extend(chunk(4, clock_offset_payload(1, i as f64, 2.0)));
    }

    let values: Vec<f64> = (0..5).map(|i| i as f64).collect();
    data.extend(chunk(3, samples_numeric_payload(1, 0.0, &values)));

    let mut options = XdfOptions::default();
    options.dejitter_timestamps = false;
    let loaded = load(Cursor::new(data), options).unwrap();

    let stream = &loaded.streams[0];
    // a constant +2s offset with zero slope should shift every timestamp by 2s
    assert!((stream.time_stamps[0] - 2.0).abs() < 1e-6);
    assert!((stream.time_stamps[4] - 2.4).abs() < 1e-6);
}

#[test]
fn empty_stream_header_with_no_samples_is_valid() {
    let mut data = b"XDF:".to_vec();
    data.extend(chunk(2, stream_header_payload(1, "Empty", 3, 500.0, "float32")));

    let loaded = load(Cursor::new(data), XdfOptions::default()).unwrap();
    assert_eq!(loaded.streams.len(), 1);
    let stream = &loaded.streams[0];
    assert_eq!(stream.time_stamps.len(), 0);
    match &stream.time_series {
        TimeSeries::Numeric(mat) => assert_eq!(mat.shape(), &[0, 3]),
        _ => panic!("expected numeric series"),
    }
    assert_eq!(stream.info.effective_srate, 0.0);
}

#[test]
fn stream_footer_attaches_to_info() {
    let mut data = b"XDF:".to_vec();
    data.extend(chunk(2, stream_header_payload(1, "EEG", 1, 0.0, "double64")));
    let mut footer = 1u32.to_le_bytes().to_vec();
    footer.extend_from_slice(b"<info><first_timestamp>0.0</first_timestamp></info>");
    data.extend(chunk(6, footer));

    let loaded = load(Cursor::new(data), XdfOptions::default()).unwrap();
    let footer_node = loaded.streams[0].info.footer.as_ref().expect("footer attached");
    assert_eq!(footer_node.child_text("first_timestamp"), Some("0.0"));
}

#[test]
fn load_path_reads_from_disk() {
    let mut data = b"XDF:".to_vec();
    data.extend(chunk(2, stream_header_payload(1, "EEG", 1, 0.0, "double64")));
    let values = [1.0, 2.0, 3.0];
    data.extend(chunk(3, samples_numeric_payload(1, 0.0, &values)));

    let path = std::env::temp_dir().join(format!("xdf-decode-test-{}.xdf", std::process::id()));
    std::fs::write(&path, &data).unwrap();

    let mut options = XdfOptions::default();
    options.synchronize_clocks = false;
    options.dejitter_timestamps = false;
    let loaded = load_path(&path, options).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.streams.len(), 1);
    assert_eq!(loaded.streams[0].time_stamps, vec![0.0, 0.0, 0.0]);
}

#[test]
fn missing_file_is_reported() {
    let path = std::env::temp_dir().join("xdf-decode-test-does-not-exist.xdf");
    let err = load_path(&path, XdfOptions::default()).unwrap_err();
    assert!(matches!(err, xdf::XdfError::FileNotFound(_)));
}
