//! ID3v2 chapter frame reader
//!
//! Walks the frames of an ID3v2.3/2.4 tag at the start of an MP3 stream.
//! `CHAP` frames give the chapters (the first `TIT2` sub-frame inside a
//! chapter is its title); top-level text frames give the tags.
//!
//! Reading is best effort: when the stream fails or a frame is malformed
//! the chapters read so far (including one whose body was cut short) are
//! returned.

use crate::codec::{read_available, read_payload, synchsafe_u32, ReadLimits};
use crate::error::Result;
use crate::format::ContainerFormat;
use crate::source::{ByteSource, ChapterExtraction, ChapterSource};
use crate::text::{decode_latin1, TextEncoding};
use chapmark_common::{MediaTags, RawMark};
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace, warn};

const HEADER_LENGTH: u64 = 10;
const FLAG_EXTENDED_HEADER: u8 = 0x40;
/// End time, start byte offset and end byte offset following a chapter start
const CHAP_SKIPPED_FIELDS: usize = 12;

/// ID3v2 tag header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    /// `major << 8 | revision`, e.g. `0x0400` for ID3v2.4.0
    pub version: u16,
    pub flags: u8,
    /// Tag size excluding the 10-byte header
    pub size: u32,
}

impl TagHeader {
    /// Parse a tag header; `None` when the magic is not `ID3`
    pub fn parse(bytes: &[u8; 10]) -> Option<Self> {
        if &bytes[..3] != b"ID3" {
            return None;
        }
        Some(Self {
            version: u16::from_be_bytes([bytes[3], bytes[4]]),
            flags: bytes[5],
            size: synchsafe_u32(u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]])),
        })
    }

    pub fn major(&self) -> u8 {
        (self.version >> 8) as u8
    }

    /// Frame sizes are synchsafe from ID3v2.4 on
    fn frame_size(&self, raw: [u8; 4]) -> u32 {
        let size = u32::from_be_bytes(raw);
        if self.version >= 0x0400 {
            synchsafe_u32(size)
        } else {
            size
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    id: [u8; 4],
    size: u32,
}

impl FrameHeader {
    fn parse(bytes: &[u8], tag: &TagHeader) -> Option<Self> {
        if bytes.len() < HEADER_LENGTH as usize {
            return None;
        }
        Some(Self {
            id: [bytes[0], bytes[1], bytes[2], bytes[3]],
            size: tag.frame_size([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Padding after the last frame
    fn is_padding(&self) -> bool {
        self.id == [0; 4]
    }
}

/// A `CHAP` frame
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChapterFrame {
    element_id: String,
    start_ms: i64,
    title: Option<String>,
}

/// Decode a text frame body: encoding byte followed by the text
fn decode_text_frame(body: &[u8]) -> Option<String> {
    let (encoding, text) = body.split_first()?;
    Some(TextEncoding::from_id3(*encoding).decode(text))
}

/// Decode a `TXXX` body into `(description, value)`
fn decode_user_text_frame(body: &[u8]) -> Option<(String, String)> {
    let (encoding, rest) = body.split_first()?;
    let encoding = TextEncoding::from_id3(*encoding);
    let (description, consumed) = encoding.decode_terminated(rest);
    let value = encoding.decode(&rest[consumed..]);
    Some((description, value))
}

/// Parse a `CHAP` body; `None` when it is too short to hold a start time
fn parse_chapter_frame(body: &[u8], tag: &TagHeader) -> Option<ChapterFrame> {
    let id_end = body.iter().position(|byte| *byte == 0)?;
    let element_id = decode_latin1(&body[..id_end]);

    let start = body.get(id_end + 1..id_end + 5)?;
    let start_ms = i64::from(u32::from_be_bytes([start[0], start[1], start[2], start[3]]));

    let mut title = None;
    let mut sub_frames = body.get(id_end + 5 + CHAP_SKIPPED_FIELDS..).unwrap_or_default();
    while let Some(header) = FrameHeader::parse(sub_frames, tag) {
        if header.is_padding() {
            break;
        }
        let body_end = (HEADER_LENGTH as usize)
            .saturating_add(header.size as usize)
            .min(sub_frames.len());
        let sub_body = &sub_frames[HEADER_LENGTH as usize..body_end];
        if &header.id == b"TIT2" && title.is_none() {
            title = decode_text_frame(sub_body);
        }
        sub_frames = &sub_frames[body_end..];
    }

    Some(ChapterFrame {
        element_id,
        start_ms,
        title,
    })
}

/// Parser state for one tag
struct FrameWalker<'a, R: ?Sized> {
    reader: &'a mut R,
    limits: ReadLimits,
    tag: TagHeader,
    seen_chapters: HashSet<String>,
    chapters: Vec<ChapterFrame>,
    tags: MediaTags,
}

impl<'a, R: Read + Seek + ?Sized> FrameWalker<'a, R> {
    /// Size of the extended header, including its size field
    fn extended_header_length(&mut self) -> Result<u64> {
        let mut raw = [0u8; 4];
        self.reader.read_exact(&mut raw)?;
        let length = if self.tag.major() >= 4 {
            u64::from(synchsafe_u32(u32::from_be_bytes(raw)))
        } else {
            u64::from(u32::from_be_bytes(raw)) + 4
        };
        self.reader.seek(SeekFrom::Current(length.saturating_sub(4) as i64))?;
        Ok(length.max(4))
    }

    fn walk(&mut self) -> Result<()> {
        let tag_size = u64::from(self.tag.size);
        let mut position = 0;

        if self.tag.flags & FLAG_EXTENDED_HEADER != 0 {
            position = self.extended_header_length()?;
            trace!(length = position, "Skipped extended header");
        }

        while position + HEADER_LENGTH <= tag_size {
            let mut raw = [0u8; HEADER_LENGTH as usize];
            self.reader.read_exact(&mut raw)?;
            position += HEADER_LENGTH;

            let Some(header) = FrameHeader::parse(&raw, &self.tag) else {
                break;
            };
            if header.is_padding() {
                trace!(position, "Reached padding");
                break;
            }

            let size = u64::from(header.size);
            if position + size > tag_size {
                debug!(
                    frame = %String::from_utf8_lossy(&header.id),
                    size,
                    "Frame overruns the tag, stopping"
                );
                break;
            }

            match &header.id {
                b"CHAP" => {
                    // lenient: a chapter cut short by the end of the stream is kept
                    let body = read_available(self.reader, size, &self.limits)?;
                    self.on_chapter(&body);
                }
                b"TIT2" | b"TPE1" | b"TALB" | b"TXXX" => {
                    let body = read_payload(self.reader, size, &self.limits)?;
                    self.on_text(&header.id, &body);
                }
                _ => {
                    self.reader.seek(SeekFrom::Current(size as i64))?;
                }
            }
            position += size;
        }
        Ok(())
    }

    fn on_chapter(&mut self, body: &[u8]) {
        let Some(chapter) = parse_chapter_frame(body, &self.tag) else {
            debug!("Skipping truncated CHAP frame");
            return;
        };
        if !self.seen_chapters.insert(chapter.element_id.clone()) {
            trace!(element_id = %chapter.element_id, "Skipping duplicate chapter");
            return;
        }
        trace!(element_id = %chapter.element_id, start_ms = chapter.start_ms, "Chapter");
        self.chapters.push(chapter);
    }

    fn on_text(&mut self, id: &[u8; 4], body: &[u8]) {
        if id == b"TXXX" {
            let Some((description, value)) = decode_user_text_frame(body) else {
                return;
            };
            if value.is_empty() {
                return;
            }
            match description.as_str() {
                "MVNM" => self.tags.series = Some(value),
                "MVIN" => {
                    if self.tags.part.is_none() {
                        self.tags.part = Some(value);
                    }
                }
                "PART" => self.tags.part = Some(value),
                other => trace!(description = other, "Ignoring TXXX frame"),
            }
            return;
        }

        let Some(value) = decode_text_frame(body).filter(|value| !value.is_empty()) else {
            return;
        };
        let slot = match id {
            b"TIT2" => &mut self.tags.title,
            b"TPE1" => &mut self.tags.artist,
            _ => &mut self.tags.album,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn finish(self) -> ChapterExtraction {
        let marks = self
            .chapters
            .into_iter()
            .filter_map(|chapter| Some(RawMark::new(chapter.start_ms, chapter.title?)))
            .collect();
        ChapterExtraction::new(marks, self.tags)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Id3Reader {
    limits: ReadLimits,
}

impl Id3Reader {
    pub fn new(limits: ReadLimits) -> Self {
        Self { limits }
    }

    pub fn read<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<ChapterExtraction> {
        let mut raw = [0u8; HEADER_LENGTH as usize];
        reader.read_exact(&mut raw)?;

        let Some(tag) = TagHeader::parse(&raw) else {
            debug!("No ID3v2 tag");
            return Ok(ChapterExtraction::default());
        };
        if tag.major() < 3 {
            debug!(version = tag.version, "ID3v2.2 and older tags are not supported");
            return Ok(ChapterExtraction::default());
        }

        let mut walker = FrameWalker {
            reader,
            limits: self.limits,
            tag,
            seen_chapters: HashSet::new(),
            chapters: Vec::new(),
            tags: MediaTags::default(),
        };
        if let Err(e) = walker.walk() {
            warn!(
                error = %e,
                chapters = walker.chapters.len(),
                "ID3 tag could not be read completely, keeping chapters read so far"
            );
        }

        let extraction = walker.finish();
        debug!(marks = extraction.marks.len(), "Extracted ID3 chapters");
        Ok(extraction)
    }
}

impl ChapterSource for Id3Reader {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Id3
    }

    fn extract(&self, source: &mut dyn ByteSource) -> Result<ChapterExtraction> {
        self.read(source)
    }
}
