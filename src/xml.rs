//! XML parsing, kept to the minimum shape the decoder relies on.
//!
//! Grounded on the `quick_xml` usage in the pack's `xdf_reader.rs`
//! (`sdraeger-DDALAB`), which drives a `quick_xml::Reader` event loop rather
//! than building a full DOM crate dependency; here the event loop builds a
//! small generic [`XmlNode`] tree instead of reading fields ad hoc, so a
//! `desc`/`footer` subtree can be preserved unchanged while `StreamHeader`'s
//! known fields are still pulled out as typed values.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::ChunkFault;
use crate::model::{ChannelFormat, StreamInfo, XmlNode};

/// Parses a UTF-8 XML blob into a generic tree rooted at its single top
/// element.
pub(crate) fn parse_xml(bytes: &[u8]) -> Result<XmlNode, ChunkFault> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let mut node = XmlNode {
                    tag,
                    ..Default::default()
                };
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_default();
                    node.attrs.push((key, value));
                }
                stack.push(node);
            }
            Ok(Event::Empty(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let mut node = XmlNode {
                    tag,
                    ..Default::default()
                };
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_default();
                    node.attrs.push((key, value));
                }
                push_finished(&mut stack, &mut root, node);
            }
            Ok(Event::Text(t)) => {
                if let Some(top) = stack.last_mut() {
                    let text = t.unescape().unwrap_or_default();
                    top.text.push_str(text.as_ref());
                }
            }
            Ok(Event::End(_)) => {
                if let Some(node) = stack.pop() {
                    push_finished(&mut stack, &mut root, node);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return Err(ChunkFault::DecodeFailure("malformed XML".into())),
        }
        buf.clear();
    }

    root.ok_or_else(|| ChunkFault::DecodeFailure("empty XML document".into()))
}

fn push_finished(stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => *root = Some(node),
    }
}

/// Extracts a [`StreamInfo`] from a parsed `<info>` document, per §3's
/// required fields.
pub(crate) fn stream_info_from_xml(stream_id: u32, info: &XmlNode) -> Result<StreamInfo, ChunkFault> {
    let name = info.child_text("name").unwrap_or_default().to_string();
    let r#type = info.child_text("type").unwrap_or_default().to_string();
    let channel_count: usize = info
        .child_text("channel_count")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let nominal_srate: f64 = info
        .child_text("nominal_srate")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0.0);
    let fmt_str = info.child_text("channel_format").unwrap_or_default();
    let channel_format = ChannelFormat::parse(fmt_str.trim())
        .ok_or_else(|| ChunkFault::UnknownChannelFormat(fmt_str.to_string()))?;
    let desc = info.child("desc").cloned();

    Ok(StreamInfo {
        stream_id,
        name,
        r#type,
        channel_count,
        nominal_srate,
        channel_format,
        desc,
        footer: None,
        effective_srate: 0.0,
    })
}
