//! Decodes the body of a `Samples` chunk: an `nsamples` count followed by
//! that many per-sample records (§4.2).

use std::io::Read;

use crate::error::ChunkFault;
use crate::model::ChannelFormat;
use crate::primitive::{read_f32, read_f64, read_u8};
use crate::varint::read_varlen_int;

/// Numeric rows decoded from one `Samples` chunk, still row-major `f64`
/// regardless of the on-disk width; integer narrowing only matters when
/// writing, which is out of scope here.
pub(crate) enum SampleChunk {
    Numeric(Vec<f64>, usize),
    String(Vec<Vec<String>>),
}

/// Decodes one `Samples` chunk payload.
///
/// `last_timestamp`/`tdiff` carry delta-decoding state across chunks within
/// the same stream and are updated in place.
pub(crate) fn decode_samples<R: Read>(
    r: &mut R,
    fmt: ChannelFormat,
    nchns: usize,
    tdiff: f64,
    last_timestamp: &mut f64,
) -> Result<(Vec<f64>, SampleChunk), ChunkFault> {
    let nsamples = read_varlen_int(r)? as usize;
    let mut stamps = Vec::with_capacity(nsamples);

    if fmt.is_string() {
        let mut rows = Vec::with_capacity(nsamples);
        for _ in 0..nsamples {
            stamps.push(next_timestamp(r, tdiff, last_timestamp)?);
            let mut row = Vec::with_capacity(nchns);
            for _ in 0..nchns {
                let len = read_varlen_int(r)? as usize;
                let mut buf = vec![0u8; len];
                r.read_exact(&mut buf)?;
                row.push(String::from_utf8_lossy(&buf).into_owned());
            }
            rows.push(row);
        }
        Ok((stamps, SampleChunk::String(rows)))
    } else {
        let mut values = Vec::with_capacity(nsamples * nchns);
        for _ in 0..nsamples {
            stamps.push(next_timestamp(r, tdiff, last_timestamp)?);
            for _ in 0..nchns {
                values.push(read_numeric(r, fmt)?);
            }
        }
        Ok((stamps, SampleChunk::Numeric(values, nchns)))
    }
}

fn next_timestamp<R: Read>(
    r: &mut R,
    tdiff: f64,
    last_timestamp: &mut f64,
) -> Result<f64, ChunkFault> {
    let has_stamp = read_u8(r)?;
    let stamp = if has_stamp != 0 {
        let s = read_f64(r)?;
        *last_timestamp = s;
        s
    } else {
        let s = *last_timestamp + tdiff;
        *last_timestamp = s;
        s
    };
    Ok(stamp)
}

fn read_numeric<R: Read>(r: &mut R, fmt: ChannelFormat) -> Result<f64, ChunkFault> {
    let v = match fmt {
        ChannelFormat::Int8 => read_u8(r)? as i8 as f64,
        ChannelFormat::Int16 => {
            let mut buf = [0u8; 2];
            r.read_exact(&mut buf)?;
            i16::from_le_bytes(buf) as f64
        }
        ChannelFormat::Int32 => {
            let mut buf = [0u8; 4];
            r.read_exact(&mut buf)?;
            i32::from_le_bytes(buf) as f64
        }
        ChannelFormat::Int64 => {
            let mut buf = [0u8; 8];
            r.read_exact(&mut buf)?;
            i64::from_le_bytes(buf) as f64
        }
        ChannelFormat::Float32 => read_f32(r)? as f64,
        ChannelFormat::Double64 => read_f64(r)?,
        ChannelFormat::String => unreachable!("string format handled separately"),
    };
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn delta_decoding_matches_spec_example() {
        // 5 samples, only the first has an explicit stamp at t=10.0,
        // tdiff=0.01, single float32 channel with arbitrary values.
        let mut bytes = vec![1u8, 5]; // nsamples varint: len=1, value=5
        for i in 0..5u8 {
            if i == 0 {
                bytes.push(1);
                bytes.extend_from_slice(&10.0f64.to_le_bytes());
            } else {
                bytes.push(0);
            }
            bytes.extend_from_slice(&(i as f32).to_le_bytes());
        }
        let mut c = Cursor::new(bytes);
        let mut last = 0.0;
        let (stamps, chunk) =
            decode_samples(&mut c, ChannelFormat::Float32, 1, 0.01, &mut last).unwrap();
        assert_eq!(stamps, vec![10.00, 10.01, 10.02, 10.03, 10.04]);
        match chunk {
            SampleChunk::Numeric(values, nchns) => {
                assert_eq!(nchns, 1);
                assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
            }
            _ => panic!("expected numeric chunk"),
        }
    }

    #[test]
    fn string_channels_decode_utf8() {
        let mut bytes = vec![1u8, 1]; // nsamples = 1
        bytes.push(1); // has_stamp
        bytes.extend_from_slice(&1.5f64.to_le_bytes());
        let label = b"mark_0";
        bytes.push(1);
        bytes.push(label.len() as u8);
        bytes.extend_from_slice(label);
        let mut c = Cursor::new(bytes);
        let mut last = 0.0;
        let (stamps, chunk) =
            decode_samples(&mut c, ChannelFormat::String, 1, 0.0, &mut last).unwrap();
        assert_eq!(stamps, vec![1.5]);
        match chunk {
            SampleChunk::String(rows) => {
                assert_eq!(rows, vec![vec!["mark_0".to_string()]]);
            }
            _ => panic!("expected string chunk"),
        }
    }
}
