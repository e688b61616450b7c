//! Top-level chunk driver (§4.1): magic check, the `(length, tag,
//! payload)` loop, and per-stream finalization.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};

use ndarray::Array2;

use crate::boundary;
use crate::clock;
use crate::error::{ChunkFault, XdfError};
use crate::jitter;
use crate::model::{FileHeader, FinalStream, LoadedFile, StreamBuffer, TimeSeries};
use crate::options::{ChunkContext, ChunkValues, XdfOptions};
use crate::primitive::{read_f64, read_u32, read_vec};
use crate::sample::{decode_samples, SampleChunk};
use crate::varint::read_varlen_int_or_eof;
use crate::xml::{parse_xml, stream_info_from_xml};

const TAG_FILE_HEADER: u16 = 1;
const TAG_STREAM_HEADER: u16 = 2;
const TAG_SAMPLES: u16 = 3;
const TAG_CLOCK_OFFSET: u16 = 4;
const TAG_STREAM_FOOTER: u16 = 6;

/// Bytes remaining before EOF beyond which a framing failure triggers the
/// boundary scanner rather than being treated as a clean end-of-file
/// (§4.1 step 2).
const EOF_SLACK_BYTES: u64 = 1024;

struct DecodeState {
    file_header: Option<FileHeader>,
    buffers: HashMap<u32, StreamBuffer>,
    order: Vec<u32>,
    saw_any_chunk: bool,
}

impl DecodeState {
    fn new() -> Self {
        DecodeState {
            file_header: None,
            buffers: HashMap::new(),
            order: Vec::new(),
            saw_any_chunk: false,
        }
    }

    fn buffer_mut_or_insert(&mut self, id: u32, info: crate::model::StreamInfo) -> &mut StreamBuffer {
        if !self.buffers.contains_key(&id) {
            self.order.push(id);
        }
        self.buffers.insert(id, StreamBuffer::new(info));
        self.buffers.get_mut(&id).unwrap()
    }
}

pub(crate) fn decode<R: Read + Seek>(
    r: &mut R,
    opts: &mut XdfOptions,
) -> Result<LoadedFile, XdfError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            XdfError::UnexpectedEof
        } else {
            XdfError::Io(e)
        }
    })?;
    if &magic != b"XDF:" {
        return Err(XdfError::BadMagic);
    }

    let total_len = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(4))?;

    let mut state = DecodeState::new();

    loop {
        let pos = r.stream_position()?;
        if pos >= total_len {
            break;
        }

        match read_chunklen(r) {
            Ok(None) => break,
            Ok(Some(chunklen)) => {
                if let Err(fault) = dispatch_chunk(r, chunklen, &mut state, opts) {
                    log::warn!("chunk decode failed at offset {pos}: {fault}; resynchronizing");
                    if !boundary::scan_forward(r)? {
                        break;
                    }
                }
            }
            Err(_malformed) => {
                if total_len - pos > EOF_SLACK_BYTES {
                    log::warn!("malformed chunk framing at offset {pos}; resynchronizing");
                    if !boundary::scan_forward(r)? {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
    }

    if !state.saw_any_chunk {
        return Err(XdfError::Empty);
    }

    let mut streams = Vec::with_capacity(state.order.len());
    for id in &state.order {
        let buf = state.buffers.remove(id).expect("order tracks present buffers");
        streams.push(finalize_stream(buf, opts));
    }

    Ok(LoadedFile {
        file_header: state.file_header.unwrap_or_default(),
        streams,
    })
}

/// Reads the chunk length prefix, or `None` on a clean EOF.
fn read_chunklen<R: Read>(r: &mut R) -> std::io::Result<Option<u64>> {
    read_varlen_int_or_eof(r)
}

fn dispatch_chunk<R: Read>(
    r: &mut R,
    chunklen: u64,
    state: &mut DecodeState,
    opts: &mut XdfOptions,
) -> Result<(), ChunkFault> {
    if chunklen < 2 {
        return Err(ChunkFault::InconsistentChunk {
            declared: chunklen,
            read: 0,
        });
    }
    let mut tag_buf = [0u8; 2];
    r.read_exact(&mut tag_buf)?;
    let tag = u16::from_le_bytes(tag_buf);
    let payload_len = (chunklen - 2) as usize;
    let payload = read_vec(r, payload_len)?;

    state.saw_any_chunk = true;
    log::debug!("dispatching chunk tag={tag} payload_len={payload_len}");

    match tag {
        TAG_FILE_HEADER => {
            let tree = parse_xml(&payload)?;
            let mut fields = HashMap::new();
            for child in &tree.children {
                fields.insert(child.tag.clone(), child.text.clone());
            }
            state.file_header = Some(FileHeader { fields });
            Ok(())
        }
        TAG_STREAM_HEADER => {
            if payload.len() < 4 {
                return Err(ChunkFault::InconsistentChunk {
                    declared: chunklen,
                    read: payload.len() as u64,
                });
            }
            let mut id_cursor = Cursor::new(&payload[0..4]);
            let stream_id = read_u32(&mut id_cursor)?;
            let tree = parse_xml(&payload[4..])?;
            let info = stream_info_from_xml(stream_id, &tree)?;
            log::info!("stream {stream_id} header: {} ({:?})", info.name, info.channel_format);
            state.buffer_mut_or_insert(stream_id, info);
            Ok(())
        }
        TAG_SAMPLES => {
            if payload.len() < 4 {
                return Err(ChunkFault::InconsistentChunk {
                    declared: chunklen,
                    read: payload.len() as u64,
                });
            }
            let mut id_cursor = Cursor::new(&payload[0..4]);
            let stream_id = read_u32(&mut id_cursor)?;
            let Some(buf) = state.buffers.get_mut(&stream_id) else {
                log::warn!("samples chunk for unknown stream {stream_id}; skipping");
                return Ok(());
            };
            let mut body = Cursor::new(&payload[4..]);
            let (mut stamps, chunk) =
                decode_samples(&mut body, buf.fmt, buf.nchns, buf.tdiff, &mut buf.last_timestamp)?;
            let mut values = match chunk {
                SampleChunk::Numeric(v, n) => ChunkValues::Numeric(v, n),
                SampleChunk::String(rows) => ChunkValues::String(rows),
            };

            if let Some(hook) = opts.on_chunk.as_mut() {
                let ctx = ChunkContext {
                    stream_id,
                    info: buf.info.clone(),
                    stamps,
                    values,
                };
                let ctx = hook(ctx);
                stamps = ctx.stamps;
                buf.info = ctx.info;
                values = ctx.values;
            }

            buf.timestamp_chunks.push(stamps);
            match values {
                ChunkValues::Numeric(v, _) => buf.sample_chunks_numeric.push(v),
                ChunkValues::String(rows) => buf.sample_chunks_string.push(rows),
            }
            Ok(())
        }
        TAG_CLOCK_OFFSET => {
            if payload.len() < 20 {
                return Err(ChunkFault::InconsistentChunk {
                    declared: chunklen,
                    read: payload.len() as u64,
                });
            }
            let mut id_cursor = Cursor::new(&payload[0..4]);
            let stream_id = read_u32(&mut id_cursor)?;
            let mut body = Cursor::new(&payload[4..20]);
            let collection_time = read_f64(&mut body)?;
            let offset_value = read_f64(&mut body)?;
            if let Some(buf) = state.buffers.get_mut(&stream_id) {
                buf.clock_times.push(collection_time);
                buf.clock_values.push(offset_value);
            } else {
                log::warn!("clock offset for unknown stream {stream_id}; skipping");
            }
            Ok(())
        }
        TAG_STREAM_FOOTER => {
            if payload.len() < 4 {
                return Err(ChunkFault::InconsistentChunk {
                    declared: chunklen,
                    read: payload.len() as u64,
                });
            }
            let mut id_cursor = Cursor::new(&payload[0..4]);
            let stream_id = read_u32(&mut id_cursor)?;
            let tree = parse_xml(&payload[4..])?;
            if let Some(buf) = state.buffers.get_mut(&stream_id) {
                buf.info.footer = Some(tree);
            } else {
                log::warn!("footer for unknown stream {stream_id}; skipping");
            }
            Ok(())
        }
        other => {
            log::debug!("skipping unknown chunk tag {other}");
            Ok(())
        }
    }
}

fn finalize_stream(buf: StreamBuffer, opts: &XdfOptions) -> FinalStream {
    let mut stamps: Vec<f64> = buf.timestamp_chunks.into_iter().flatten().collect();

    if opts.synchronize_clocks && !buf.clock_times.is_empty() {
        clock::apply_clock_sync(&mut stamps, &buf.clock_times, &buf.clock_values, opts);
    }

    let effective_srate = if opts.dejitter_timestamps {
        jitter::dejitter(&mut stamps, buf.tdiff, opts)
    } else if buf.srate > 0.0 && stamps.len() >= 2 {
        let dur = stamps[stamps.len() - 1] - stamps[0];
        if dur > 0.0 {
            stamps.len() as f64 / dur
        } else {
            0.0
        }
    } else {
        0.0
    };

    let mut info = buf.info;
    info.effective_srate = effective_srate;

    let time_series = if buf.fmt.is_string() {
        TimeSeries::String(buf.sample_chunks_string.into_iter().flatten().collect())
    } else {
        let flat: Vec<f64> = buf.sample_chunks_numeric.into_iter().flatten().collect();
        let rows = if buf.nchns > 0 { flat.len() / buf.nchns } else { 0 };
        let mat = Array2::from_shape_vec((rows, buf.nchns), flat)
            .unwrap_or_else(|_| Array2::zeros((0, buf.nchns)));
        TimeSeries::Numeric(mat)
    };

    FinalStream {
        info,
        time_stamps: stamps,
        time_series,
    }
}
