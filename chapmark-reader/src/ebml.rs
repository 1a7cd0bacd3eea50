//! EBML element walker
//!
//! Parses an EBML stream (Matroska, WebM) into a [`Tree`] of elements.
//! Only master elements that can lead to chapters or tags are descended
//! into; everything else (clusters, cues, attachments) is skipped by size
//! without reading its payload.

use crate::codec::{be_uint, read_at, read_ebml_id, read_ebml_size, stream_len, ReadLimits};
use crate::error::{ReadError, Result};
use crate::text::decode_padded_utf8;
use crate::tree::{NodeId, Tree};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Element ids (marker bits included)
pub mod ids {
    pub const EBML: u32 = 0x1A45_DFA3;
    pub const DOC_TYPE: u32 = 0x4282;

    pub const SEGMENT: u32 = 0x1853_8067;
    pub const CLUSTER: u32 = 0x1F43_B675;
    pub const VOID: u32 = 0xEC;

    pub const INFO: u32 = 0x1549_A966;
    pub const TITLE: u32 = 0x7BA9;

    pub const CHAPTERS: u32 = 0x1043_A770;
    pub const EDITION_ENTRY: u32 = 0x45B9;
    pub const EDITION_FLAG_HIDDEN: u32 = 0x45BD;
    pub const EDITION_FLAG_DEFAULT: u32 = 0x45DB;
    pub const EDITION_FLAG_ORDERED: u32 = 0x45DD;
    pub const CHAPTER_ATOM: u32 = 0xB6;
    pub const CHAPTER_TIME_START: u32 = 0x91;
    pub const CHAPTER_FLAG_HIDDEN: u32 = 0x98;
    pub const CHAPTER_DISPLAY: u32 = 0x80;
    pub const CHAP_STRING: u32 = 0x85;
    pub const CHAP_LANGUAGE: u32 = 0x437C;

    pub const TAGS: u32 = 0x1254_C367;
    pub const TAG: u32 = 0x7373;
    pub const SIMPLE_TAG: u32 = 0x67C8;
    pub const TAG_NAME: u32 = 0x45A3;
    pub const TAG_STRING: u32 = 0x4487;
}

/// Master elements the walker descends into
fn is_master(id: u32) -> bool {
    matches!(
        id,
        ids::EBML
            | ids::SEGMENT
            | ids::INFO
            | ids::CHAPTERS
            | ids::EDITION_ENTRY
            | ids::CHAPTER_ATOM
            | ids::CHAPTER_DISPLAY
            | ids::TAGS
            | ids::TAG
            | ids::SIMPLE_TAG
    )
}

/// Accepted `DocType` values
pub const SUPPORTED_DOC_TYPES: &[&str] = &["matroska", "webm"];

/// A parsed EBML stream
#[derive(Debug)]
pub struct EbmlDocument {
    pub doc_type: Option<String>,
    pub tree: Tree<u32>,
    pub segment: NodeId,
    limits: ReadLimits,
}

struct ElementHeader {
    id: u32,
    size: Option<u64>,
    payload_start: u64,
}

/// Parser state for one walk over one stream
struct Walker<'a, R: ?Sized> {
    reader: &'a mut R,
    limits: ReadLimits,
    tree: Tree<u32>,
}

impl<'a, R: Read + Seek + ?Sized> Walker<'a, R> {
    fn read_header(&mut self, position: u64) -> Result<ElementHeader> {
        self.reader.seek(SeekFrom::Start(position))?;
        let (id, id_length) = read_ebml_id(self.reader)?;
        let (size, size_length) = read_ebml_size(self.reader)?;
        Ok(ElementHeader {
            id,
            size,
            payload_start: position + u64::from(id_length) + u64::from(size_length),
        })
    }

    /// Walk the children of `parent`, whose payload ends at `end`
    fn walk_children(&mut self, parent: NodeId, end: u64, depth: usize) -> Result<()> {
        self.limits.check_depth(depth)?;

        let mut position = self.tree.node(parent).range.start;
        // the smallest element header is two bytes
        while end.saturating_sub(position) >= 2 {
            let header = match self.read_header(position) {
                Ok(header) => header,
                Err(e) => {
                    debug!(position, error = %e, "Unreadable element header, ending walk");
                    break;
                }
            };

            let size = match header.size {
                Some(size) => size,
                None if is_master(header.id) => end.saturating_sub(header.payload_start),
                None => {
                    debug!(
                        id = header.id,
                        position,
                        "Unknown-size element cannot be skipped, ending walk"
                    );
                    break;
                }
            };

            let mut element_end = header.payload_start.saturating_add(size);
            if element_end > end {
                trace!(
                    id = header.id,
                    declared_end = element_end,
                    parent_end = end,
                    "Element overruns its parent, clamping"
                );
                element_end = end;
            }

            if header.id != ids::VOID {
                let node = self
                    .tree
                    .push(Some(parent), header.id, header.payload_start..element_end);
                if is_master(header.id) {
                    self.walk_children(node, element_end, depth + 1)?;
                }
            }

            position = element_end;
        }
        Ok(())
    }
}

/// Parse the EBML header and the Segment element hierarchy
///
/// # Errors
/// - [`ReadError::InvalidHeader`] when the stream does not start with an
///   EBML header or its second element is not a Segment
/// - [`ReadError::Unsupported`] for a `DocType` other than Matroska or WebM
/// - [`ReadError::Io`] when the byte source fails
pub fn read_document<R: Read + Seek + ?Sized>(
    reader: &mut R,
    limits: &ReadLimits,
) -> Result<EbmlDocument> {
    let total = stream_len(reader)?;
    let start = reader.stream_position()?;

    let mut walker = Walker {
        reader: &mut *reader,
        limits: *limits,
        tree: Tree::new(),
    };

    let header = walker.read_header(start)?;
    if header.id != ids::EBML {
        return Err(ReadError::InvalidHeader(format!(
            "Expected EBML header, found element 0x{:X}",
            header.id
        )));
    }
    let header_size = header
        .size
        .ok_or_else(|| ReadError::InvalidHeader("EBML header has unknown size".to_string()))?;
    let header_end = header.payload_start.saturating_add(header_size).min(total);
    let ebml = walker
        .tree
        .push(None, ids::EBML, header.payload_start..header_end);
    walker.walk_children(ebml, header_end, 1)?;

    let doc_type = match walker.tree.child(Some(ebml), ids::DOC_TYPE) {
        Some(node) => {
            let range = walker.tree.node(node).range.clone();
            let bytes = read_at(walker.reader, range.start, range.end - range.start, limits)?;
            Some(decode_padded_utf8(&bytes))
        }
        None => None,
    };
    if let Some(doc_type) = &doc_type {
        if !SUPPORTED_DOC_TYPES.contains(&doc_type.as_str()) {
            return Err(ReadError::Unsupported(format!("DocType '{}'", doc_type)));
        }
    }

    let segment_header = walker.read_header(header_end)?;
    if segment_header.id != ids::SEGMENT {
        return Err(ReadError::InvalidHeader(format!(
            "Expected Segment after EBML header, found element 0x{:X}",
            segment_header.id
        )));
    }
    let segment_end = match segment_header.size {
        Some(size) => segment_header.payload_start.saturating_add(size).min(total),
        None => total,
    };
    let segment = walker
        .tree
        .push(None, ids::SEGMENT, segment_header.payload_start..segment_end);
    walker.walk_children(segment, segment_end, 1)?;

    let document = EbmlDocument {
        doc_type,
        tree: walker.tree,
        segment,
        limits: *limits,
    };

    debug!(
        doc_type = ?document.doc_type,
        elements = document.tree.len(),
        "Parsed EBML document"
    );
    Ok(document)
}

impl EbmlDocument {
    /// Unsigned integer value of an element
    pub fn uint<R: Read + Seek + ?Sized>(&self, reader: &mut R, node: NodeId) -> Result<u64> {
        let element = self.tree.node(node);
        let bytes = read_at(reader, element.range.start, element.len(), &self.limits)?;
        be_uint(&bytes).ok_or_else(|| {
            ReadError::Structural(format!(
                "Integer element 0x{:X} is {} bytes long",
                element.kind,
                bytes.len()
            ))
        })
    }

    /// UTF-8 string value of an element, without NUL padding
    pub fn string<R: Read + Seek + ?Sized>(&self, reader: &mut R, node: NodeId) -> Result<String> {
        let element = self.tree.node(node);
        let bytes = read_at(reader, element.range.start, element.len(), &self.limits)?;
        Ok(decode_padded_utf8(&bytes))
    }

    /// Value of the first child `id` of `parent`, if present
    pub fn child_uint<R: Read + Seek + ?Sized>(
        &self,
        reader: &mut R,
        parent: Option<NodeId>,
        id: u32,
    ) -> Result<Option<u64>> {
        self.tree
            .child(parent, id)
            .map(|node| self.uint(reader, node))
            .transpose()
    }

    pub fn child_string<R: Read + Seek + ?Sized>(
        &self,
        reader: &mut R,
        parent: Option<NodeId>,
        id: u32,
    ) -> Result<Option<String>> {
        self.tree
            .child(parent, id)
            .map(|node| self.string(reader, node))
            .transpose()
    }

    /// Whether the first child flag `id` of `parent` is set (absent means unset)
    pub fn flag<R: Read + Seek + ?Sized>(
        &self,
        reader: &mut R,
        parent: NodeId,
        id: u32,
    ) -> Result<bool> {
        Ok(self.child_uint(reader, Some(parent), id)?.unwrap_or(0) == 1)
    }
}
