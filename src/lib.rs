//! A decoder for the Extensible Data Format (XDF): a chunked binary
//! container for one or more heterogeneously-typed, timestamped sample
//! streams plus the clock-synchronization measurements needed to align
//! them onto a common timeline.
//!
//! [`load`] (or [`load_path`]) reads such a file end to end and returns,
//! for every stream, its declared metadata, a dense vector of sample
//! timestamps, and a matching matrix (or string table) of channel values,
//! with clocks synchronized and per-sample jitter removed from regularly
//! sampled streams. [`sync_timestamps`] and [`limit_to_overlap`] are
//! optional post-processing steps that lift a set of already-loaded
//! streams onto a common grid.
//!
//! Decoding never aborts outright on a corrupt chunk: a malformed varint
//! or a failed sample decode is logged and the decoder resynchronizes on
//! the next boundary sentinel, continuing with whatever is recoverable.
//! Only a missing file, a bad magic, or a file with no recognizable chunk
//! at all surface as an [`XdfError`].
//!
//! This crate does not write XDF, does not support streaming/incremental
//! consumption (the input must be seekable), and does not harden against
//! adversarial input.

mod align;
mod boundary;
mod chunk;
mod clock;
mod error;
mod jitter;
mod model;
mod options;
mod primitive;
mod robust_fit;
mod sample;
mod varint;
mod xml;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

pub use align::{limit_to_overlap, sync_timestamps};
pub use error::XdfError;
pub use model::{
    ChannelFormat, FileHeader, FinalStream, LoadedFile, StreamInfo, TimeSeries, XmlNode,
};
pub use options::{ChunkContext, ChunkValues, XdfOptions};

/// Decodes an XDF file from an already-open, seekable reader.
///
/// See the crate-level docs for the recovery policy on corrupt chunks.
pub fn load<R: Read + Seek>(mut reader: R, mut options: XdfOptions) -> Result<LoadedFile, XdfError> {
    chunk::decode(&mut reader, &mut options)
}

/// Opens and decodes the XDF file at `path`.
pub fn load_path<P: AsRef<Path>>(path: P, options: XdfOptions) -> Result<LoadedFile, XdfError> {
    let file = File::open(path.as_ref()).map_err(XdfError::FileNotFound)?;
    load(BufReader::new(file), options)
}
