//! Public data model: the shapes returned by [`crate::load`].

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A generic XML element tree, used for free-form metadata (`desc`,
/// `footer`) that the decoder passes through unchanged rather than
/// interpreting.
///
/// Per the design notes, only `desc`/`footer` get this generic shape;
/// every field the decoder actually consumes (`name`, `channel_count`, …)
/// is a proper field on [`StreamInfo`], not a tree lookup.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct XmlNode {
    /// Element tag name.
    pub tag: String,
    /// Element attributes, in document order.
    pub attrs: Vec<(String, String)>,
    /// Concatenated text content directly under this element.
    pub text: String,
    /// Child elements, in document order.
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Returns the text content of the first direct child with the given
    /// tag name, if any.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|c| c.tag == tag)
            .map(|c| c.text.as_str())
    }

    /// Returns the first direct child with the given tag name, if any.
    pub fn child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Returns all direct children with the given tag name.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}

/// Numeric or textual encoding of a stream's channel samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChannelFormat {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Double64,
    String,
}

impl ChannelFormat {
    pub(crate) fn parse(s: &str) -> Option<ChannelFormat> {
        match s {
            "int8" => Some(ChannelFormat::Int8),
            "int16" => Some(ChannelFormat::Int16),
            "int32" => Some(ChannelFormat::Int32),
            "int64" => Some(ChannelFormat::Int64),
            "float32" => Some(ChannelFormat::Float32),
            "double64" => Some(ChannelFormat::Double64),
            "string" => Some(ChannelFormat::String),
            _ => None,
        }
    }

    /// Byte width of one channel value on disk; meaningless for `String`.
    pub(crate) fn bytes_per_sample(self) -> usize {
        match self {
            ChannelFormat::Int8 => 1,
            ChannelFormat::Int16 => 2,
            ChannelFormat::Int32 => 4,
            ChannelFormat::Int64 => 8,
            ChannelFormat::Float32 => 4,
            ChannelFormat::Double64 => 8,
            ChannelFormat::String => 0,
        }
    }

    pub(crate) fn is_integer(self) -> bool {
        matches!(
            self,
            ChannelFormat::Int8 | ChannelFormat::Int16 | ChannelFormat::Int32 | ChannelFormat::Int64
        )
    }

    pub(crate) fn is_string(self) -> bool {
        matches!(self, ChannelFormat::String)
    }
}

/// Declared metadata for one stream, parsed from its `StreamHeader` chunk.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StreamInfo {
    pub stream_id: u32,
    pub name: String,
    pub r#type: String,
    pub channel_count: usize,
    pub nominal_srate: f64,
    pub channel_format: ChannelFormat,
    /// Free-form per-stream metadata (channel labels, units, …), passed
    /// through unchanged.
    pub desc: Option<XmlNode>,
    /// Attached from the stream's `StreamFooter`, if one was present.
    pub footer: Option<XmlNode>,
    /// Populated by the jitter remover; `0` for irregular streams or when
    /// dejittering was disabled.
    pub effective_srate: f64,
}

/// One decoded, finalized sample matrix.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeSeries {
    /// Dense `rows x channel_count` numeric matrix, row-major.
    Numeric(ndarray::Array2<f64>),
    /// `rows` lists of `channel_count` UTF-8 strings.
    String(Vec<Vec<String>>),
}

impl TimeSeries {
    pub fn rows(&self) -> usize {
        match self {
            TimeSeries::Numeric(a) => a.shape()[0],
            TimeSeries::String(v) => v.len(),
        }
    }
}

/// A fully decoded, clock-synchronized, dejittered stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FinalStream {
    pub info: StreamInfo,
    pub time_stamps: Vec<f64>,
    pub time_series: TimeSeries,
}

/// File-level metadata from the single `FileHeader` chunk, flattened into
/// a simple string map (`version`, recording `datetime`, etc.) rather than
/// the dict-of-lists shape the original XML flattening used.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileHeader {
    pub fields: HashMap<String, String>,
}

/// Result of [`crate::load`]: file-level metadata plus every stream, in
/// file order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoadedFile {
    pub file_header: FileHeader,
    pub streams: Vec<FinalStream>,
}

/// Transient per-stream accumulator, alive only while decoding.
#[derive(Debug)]
pub(crate) struct StreamBuffer {
    pub info: StreamInfo,
    pub timestamp_chunks: Vec<Vec<f64>>,
    pub sample_chunks_numeric: Vec<Vec<f64>>,
    pub sample_chunks_string: Vec<Vec<Vec<String>>>,
    pub clock_times: Vec<f64>,
    pub clock_values: Vec<f64>,
    pub last_timestamp: f64,
    pub nchns: usize,
    pub srate: f64,
    pub fmt: ChannelFormat,
    pub tdiff: f64,
}

impl StreamBuffer {
    pub(crate) fn new(info: StreamInfo) -> Self {
        let nchns = info.channel_count;
        let srate = info.nominal_srate;
        let fmt = info.channel_format;
        let tdiff = if srate > 0.0 { 1.0 / srate } else { 0.0 };
        StreamBuffer {
            info,
            timestamp_chunks: Vec::new(),
            sample_chunks_numeric: Vec::new(),
            sample_chunks_string: Vec::new(),
            clock_times: Vec::new(),
            clock_values: Vec::new(),
            last_timestamp: 0.0,
            nchns,
            srate,
            fmt,
            tdiff,
        }
    }
}
