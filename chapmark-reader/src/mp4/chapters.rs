//! MP4 chapter sources
//!
//! - Nero `chpl`: a flat list of `(start, title)` entries in `udta`
//! - QuickTime chapter track: a text track referenced by `tref/chap`,
//!   whose samples are the titles and whose sample timing gives the starts

use super::boxes::{read_payload, BoxTree, FourCc};
use super::sample_table::{
    chunk_start_ticks, parse_chunk_offsets, parse_sample_to_chunk, parse_time_to_sample,
};
use crate::codec::{read_at, ReadLimits};
use crate::error::Result;
use crate::text::decode_sample_text;
use crate::tree::NodeId;
use byteorder::{BigEndian, ReadBytesExt};
use chapmark_common::time::{hundred_ns_to_ms, ticks_to_ms};
use chapmark_common::RawMark;
use std::io::{Cursor, Read, Seek};
use tracing::{debug, trace, warn};

/// Parse a Nero `chpl` payload
///
/// Layout: version (1), flags (3), reserved (4, version 1 only), entry
/// count (1), then per entry a 64-bit start in 100 ns units, a title
/// length (1) and the UTF-8 title. A truncated entry ends the list.
pub fn parse_chpl(payload: &[u8]) -> Vec<RawMark> {
    let mut cursor = Cursor::new(payload);
    let mut marks = Vec::new();

    let Ok(count) = read_chpl_count(&mut cursor) else {
        debug!("Truncated chpl header");
        return marks;
    };

    for _ in 0..count {
        match read_chpl_entry(&mut cursor) {
            Ok(mark) => marks.push(mark),
            Err(_) => {
                debug!(declared = count, read = marks.len(), "Truncated chpl entry list");
                break;
            }
        }
    }
    marks
}

fn read_chpl_count(cursor: &mut Cursor<&[u8]>) -> std::io::Result<u8> {
    let version = cursor.read_u8()?;
    let _flags = cursor.read_u24::<BigEndian>()?;
    if version == 1 {
        let _reserved = cursor.read_u32::<BigEndian>()?;
    }
    cursor.read_u8()
}

fn read_chpl_entry(cursor: &mut Cursor<&[u8]>) -> std::io::Result<RawMark> {
    let start = cursor.read_u64::<BigEndian>()?;
    let length = cursor.read_u8()?;
    let mut title = vec![0; usize::from(length)];
    cursor.read_exact(&mut title)?;
    Ok(RawMark::new(hundred_ns_to_ms(start), decode_sample_text(&title)))
}

/// Chapters from a `chpl` box at `moov/udta/chpl` or `moov/udta/meta/chpl`
pub fn nero_chapters<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    limits: &ReadLimits,
) -> Result<Vec<RawMark>> {
    let candidates = [
        &[FourCc::MOOV, FourCc::UDTA, FourCc::CHPL][..],
        &[FourCc::MOOV, FourCc::UDTA, FourCc::META, FourCc::CHPL][..],
    ];
    for path in candidates {
        if let Some(chpl) = tree.path(None, path) {
            let marks = parse_chpl(&read_payload(reader, tree, chpl, limits)?);
            if !marks.is_empty() {
                debug!(marks = marks.len(), "Found Nero chapters");
                return Ok(marks);
            }
        }
    }
    Ok(Vec::new())
}

/// Track id declared by a `tkhd` payload
pub fn parse_track_id(tkhd: &[u8]) -> Result<u32> {
    let mut cursor = Cursor::new(tkhd);
    let version = cursor.read_u8()?;
    let _flags = cursor.read_u24::<BigEndian>()?;
    // creation and modification times
    let times = if version == 1 { 16 } else { 8 };
    cursor.set_position(cursor.position() + times);
    Ok(cursor.read_u32::<BigEndian>()?)
}

/// Time scale (ticks per second) declared by an `mdhd` payload
pub fn parse_timescale(mdhd: &[u8]) -> Result<u32> {
    let mut cursor = Cursor::new(mdhd);
    let version = cursor.read_u8()?;
    let _flags = cursor.read_u24::<BigEndian>()?;
    let times = if version == 1 { 16 } else { 8 };
    cursor.set_position(cursor.position() + times);
    Ok(cursor.read_u32::<BigEndian>()?)
}

/// First non-zero track id referenced by any `trak/tref/chap`
fn chapter_track_id<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    moov: NodeId,
    limits: &ReadLimits,
) -> Result<Option<u32>> {
    let chap_boxes: Vec<NodeId> = tree
        .children_of_kind(Some(moov), FourCc::TRAK)
        .filter_map(|trak| tree.path(Some(trak), &[FourCc::TREF, FourCc::CHAP]))
        .collect();

    for chap in chap_boxes {
        let payload = read_payload(reader, tree, chap, limits)?;
        let id = payload
            .chunks_exact(4)
            .map(|bytes| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .find(|id| *id != 0);
        if id.is_some() {
            return Ok(id);
        }
    }
    Ok(None)
}

/// The `trak` whose `tkhd` declares `track_id`
fn find_track<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    moov: NodeId,
    track_id: u32,
    limits: &ReadLimits,
) -> Result<Option<NodeId>> {
    let tracks: Vec<NodeId> = tree.children_of_kind(Some(moov), FourCc::TRAK).collect();
    for trak in tracks {
        let Some(tkhd) = tree.child(Some(trak), FourCc::TKHD) else {
            continue;
        };
        if parse_track_id(&read_payload(reader, tree, tkhd, limits)?)? == track_id {
            return Ok(Some(trak));
        }
    }
    Ok(None)
}

/// Chapters from the text track referenced by `tref/chap`
///
/// Returns an empty list whenever a box needed to place the chapters is
/// missing or empty.
pub fn track_chapters<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    limits: &ReadLimits,
) -> Result<Vec<RawMark>> {
    let Some(moov) = tree.child(None, FourCc::MOOV) else {
        return Ok(Vec::new());
    };
    let Some(track_id) = chapter_track_id(reader, tree, moov, limits)? else {
        trace!("No chapter track reference");
        return Ok(Vec::new());
    };
    let Some(trak) = find_track(reader, tree, moov, track_id, limits)? else {
        debug!(track_id, "Referenced chapter track not found");
        return Ok(Vec::new());
    };

    let Some(mdhd) = tree.path(Some(trak), &[FourCc::MDIA, FourCc::MDHD]) else {
        debug!(track_id, "No time scale found for chapter track");
        return Ok(Vec::new());
    };
    let Some(stbl) = tree.path(Some(trak), &[FourCc::MDIA, FourCc::MINF, FourCc::STBL]) else {
        debug!(track_id, "No sample table found for chapter track");
        return Ok(Vec::new());
    };

    let stco = tree.child(Some(stbl), FourCc::STCO);
    let co64 = tree.child(Some(stbl), FourCc::CO64);
    let offsets = match (stco, co64) {
        (Some(stco), _) => {
            parse_chunk_offsets(&read_payload(reader, tree, stco, limits)?, false)?
        }
        (None, Some(co64)) => {
            parse_chunk_offsets(&read_payload(reader, tree, co64, limits)?, true)?
        }
        (None, None) => {
            debug!(track_id, "No chunk offsets found for chapter track");
            return Ok(Vec::new());
        }
    };
    let Some(stts) = tree.child(Some(stbl), FourCc::STTS) else {
        debug!(track_id, "No durations found for chapter track");
        return Ok(Vec::new());
    };
    let Some(stsc) = tree.child(Some(stbl), FourCc::STSC) else {
        debug!(track_id, "No stsc entries found for chapter track");
        return Ok(Vec::new());
    };

    let time_to_sample = parse_time_to_sample(&read_payload(reader, tree, stts, limits)?)?;
    let sample_to_chunk = parse_sample_to_chunk(&read_payload(reader, tree, stsc, limits)?)?;
    if sample_to_chunk.is_empty() {
        debug!(track_id, "Chapter track has no stsc entries");
        return Ok(Vec::new());
    }

    let timescale = parse_timescale(&read_payload(reader, tree, mdhd, limits)?)?;
    if timescale == 0 {
        debug!(track_id, "Chapter track has a zero time scale");
        return Ok(Vec::new());
    }

    let starts = match chunk_start_ticks(offsets.len(), &time_to_sample, &sample_to_chunk) {
        Ok(starts) => starts,
        Err(e) => {
            warn!(track_id, error = %e, "Malformed chapter track sample table");
            return Ok(Vec::new());
        }
    };
    let mut marks = Vec::with_capacity(offsets.len());
    for (offset, start) in offsets.iter().zip(starts) {
        let name = read_sample_text(reader, *offset, limits)?;
        let start_ms = ticks_to_ms(start, timescale).unwrap_or(0);
        marks.push(RawMark::new(start_ms, name));
    }

    marks.sort_by_key(|mark| mark.start_ms);
    debug!(track_id, timescale, marks = marks.len(), "Found chapter track chapters");
    Ok(marks)
}

/// A text sample: 16-bit big-endian length followed by the text
fn read_sample_text<R: Read + Seek + ?Sized>(
    reader: &mut R,
    offset: u64,
    limits: &ReadLimits,
) -> Result<String> {
    let length = read_at(reader, offset, 2, limits)?;
    let length = u16::from_be_bytes([length[0], length[1]]);
    let text = read_at(reader, offset + 2, u64::from(length), limits)?;
    Ok(decode_sample_text(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chpl_entry(start_100ns: u64, title: &str) -> Vec<u8> {
        let mut out = start_100ns.to_be_bytes().to_vec();
        out.push(title.len() as u8);
        out.extend_from_slice(title.as_bytes());
        out
    }

    #[test]
    fn test_parse_chpl_version_one() {
        let mut payload = vec![1, 0, 0, 0, 0, 0, 0, 0, 2];
        payload.extend(chpl_entry(0, "Intro"));
        payload.extend(chpl_entry(600_000_000, "Part Two"));

        let marks = parse_chpl(&payload);
        assert_eq!(
            marks,
            vec![RawMark::new(0, "Intro"), RawMark::new(60_000, "Part Two")]
        );
    }

    #[test]
    fn test_parse_chpl_version_zero() {
        let mut payload = vec![0, 0, 0, 0, 1];
        payload.extend(chpl_entry(15_000, "One"));
        assert_eq!(parse_chpl(&payload), vec![RawMark::new(1, "One")]);
    }

    #[test]
    fn test_parse_chpl_truncated_keeps_complete_entries() {
        let mut payload = vec![0, 0, 0, 0, 3];
        payload.extend(chpl_entry(0, "One"));
        payload.extend(&chpl_entry(10_000, "Two")[..6]);
        assert_eq!(parse_chpl(&payload), vec![RawMark::new(0, "One")]);
        assert!(parse_chpl(&[1, 0]).is_empty());
    }

    #[test]
    fn test_parse_track_id_versions() {
        let mut v0 = vec![0, 0, 0, 7];
        v0.extend_from_slice(&[0; 8]);
        v0.extend_from_slice(&2u32.to_be_bytes());
        assert_eq!(parse_track_id(&v0).unwrap(), 2);

        let mut v1 = vec![1, 0, 0, 7];
        v1.extend_from_slice(&[0; 16]);
        v1.extend_from_slice(&9u32.to_be_bytes());
        assert_eq!(parse_track_id(&v1).unwrap(), 9);
    }

    #[test]
    fn test_parse_timescale_versions() {
        let mut v0 = vec![0, 0, 0, 0];
        v0.extend_from_slice(&[0; 8]);
        v0.extend_from_slice(&44_100u32.to_be_bytes());
        assert_eq!(parse_timescale(&v0).unwrap(), 44_100);

        let mut v1 = vec![1, 0, 0, 0];
        v1.extend_from_slice(&[0; 16]);
        v1.extend_from_slice(&1000u32.to_be_bytes());
        assert_eq!(parse_timescale(&v1).unwrap(), 1000);

        assert!(parse_timescale(&[0, 0, 0, 0, 1]).is_err());
    }
}
