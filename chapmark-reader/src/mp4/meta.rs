//! iTunes-style metadata (`udta/meta/ilst`)
//!
//! Every `ilst` item box holds a `data` box: type (4 bytes: version and
//! well-known type), locale (4 bytes), value. Freeform `----` items carry
//! an additional `mean` (namespace) and `name` box.

use super::boxes::{read_payload, BoxTree, FourCc};
use crate::codec::{be_uint, ReadLimits};
use crate::error::Result;
use crate::tree::NodeId;
use chapmark_common::MediaTags;
use encoding_rs::{UTF_16BE, UTF_8};
use std::io::{Read, Seek};
use tracing::{debug, trace};

/// Well-known `data` type for UTF-16 text
const DATA_TYPE_UTF16: u32 = 2;

/// Decoded `data` box
struct DataValue<'a> {
    data_type: u32,
    value: &'a [u8],
}

fn parse_data(payload: &[u8]) -> Option<DataValue<'_>> {
    if payload.len() < 8 {
        return None;
    }
    let data_type = u32::from_be_bytes([0, payload[1], payload[2], payload[3]]);
    Some(DataValue {
        data_type,
        value: &payload[8..],
    })
}

impl DataValue<'_> {
    fn text(&self) -> Option<String> {
        let text = if self.data_type == DATA_TYPE_UTF16 {
            UTF_16BE.decode_without_bom_handling(self.value).0.into_owned()
        } else {
            UTF_8.decode_with_bom_removal(self.value).0.into_owned()
        };
        let text = text.trim_end_matches('\0').trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    fn integer(&self) -> Option<u64> {
        if self.value.is_empty() {
            return None;
        }
        be_uint(self.value)
    }
}

fn item_data<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    item: NodeId,
    limits: &ReadLimits,
) -> Result<Option<Vec<u8>>> {
    tree.child(Some(item), FourCc::DATA)
        .map(|data| read_payload(reader, tree, data, limits))
        .transpose()
}

/// Property name of a freeform item (`name` box: version/flags, then text)
fn freeform_name<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    item: NodeId,
    limits: &ReadLimits,
) -> Result<Option<String>> {
    let Some(name) = tree.child(Some(item), FourCc::NAME) else {
        return Ok(None);
    };
    let payload = read_payload(reader, tree, name, limits)?;
    Ok(payload
        .get(4..)
        .map(|text| String::from_utf8_lossy(text).trim_end_matches('\0').to_string()))
}

/// Read title, artist, album, series and part from the `ilst` box
pub fn read_tags<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    limits: &ReadLimits,
) -> Result<MediaTags> {
    let mut tags = MediaTags::default();

    let ilst = tree
        .path(None, &[FourCc::MOOV, FourCc::UDTA, FourCc::META, FourCc::ILST])
        .or_else(|| tree.path(None, &[FourCc::MOOV, FourCc::META, FourCc::ILST]));
    let Some(ilst) = ilst else {
        trace!("No ilst box");
        return Ok(tags);
    };

    let mut movement_index = None;
    let items: Vec<NodeId> = tree.children(ilst).to_vec();
    for item in items {
        let kind = tree.kind(item);
        let Some(payload) = item_data(reader, tree, item, limits)? else {
            continue;
        };
        let Some(data) = parse_data(&payload) else {
            continue;
        };

        match kind {
            FourCc::TITLE => tags.title = tags.title.take().or_else(|| data.text()),
            FourCc::ARTIST => tags.artist = tags.artist.take().or_else(|| data.text()),
            FourCc::ALBUM => tags.album = tags.album.take().or_else(|| data.text()),
            FourCc::MOVEMENT_NAME => tags.series = data.text().or(tags.series.take()),
            FourCc::MOVEMENT_INDEX => movement_index = data.integer(),
            FourCc::FREEFORM => match freeform_name(reader, tree, item, limits)?.as_deref() {
                Some("PART") => tags.part = data.text().or(tags.part.take()),
                Some("SERIES") => tags.series = data.text().or(tags.series.take()),
                other => trace!(name = ?other, "Ignoring freeform item"),
            },
            other => trace!(kind = %other, "Ignoring ilst item"),
        }
    }

    if tags.part.is_none() {
        tags.part = movement_index.map(|index| index.to_string());
    }

    debug!(?tags, "Read MP4 metadata");
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_text_and_integer() {
        let mut payload = vec![0, 0, 0, 1, 0, 0, 0, 0];
        payload.extend_from_slice(b"Dune\0");
        let data = parse_data(&payload).unwrap();
        assert_eq!(data.text().as_deref(), Some("Dune"));

        let data = parse_data(&[0, 0, 0, 21, 0, 0, 0, 0, 0, 3]).unwrap();
        assert_eq!(data.integer(), Some(3));

        let data = parse_data(&[0, 0, 0, 2, 0, 0, 0, 0, 0, b'A']).unwrap();
        assert_eq!(data.text().as_deref(), Some("A"));
    }

    #[test]
    fn test_short_or_blank_data() {
        assert!(parse_data(&[0, 0, 0]).is_none());
        let data = parse_data(&[0, 0, 0, 1, 0, 0, 0, 0, b' ']).unwrap();
        assert!(data.text().is_none());
        let data = parse_data(&[0, 0, 0, 21, 0, 0, 0, 0]).unwrap();
        assert!(data.integer().is_none());
    }
}
