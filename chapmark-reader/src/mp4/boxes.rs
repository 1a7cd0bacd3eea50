//! MP4 box tree
//!
//! Box headers are `size: u32, type: [u8; 4]`. A size of 1 means a 64-bit
//! size follows the type; a size of 0 means the box runs to the end of its
//! parent (or of the file). Only boxes on the way to chapter and tag data
//! are descended into.

use crate::codec::{read_at, stream_len, ReadLimits};
use crate::error::{ReadError, Result};
use crate::tree::{NodeId, Tree};
use byteorder::{BigEndian, ReadBytesExt};
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, trace};

/// Four-character box type
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const MOOV: FourCc = FourCc(*b"moov");
    pub const TRAK: FourCc = FourCc(*b"trak");
    pub const TKHD: FourCc = FourCc(*b"tkhd");
    pub const TREF: FourCc = FourCc(*b"tref");
    pub const CHAP: FourCc = FourCc(*b"chap");
    pub const MDIA: FourCc = FourCc(*b"mdia");
    pub const MDHD: FourCc = FourCc(*b"mdhd");
    pub const MINF: FourCc = FourCc(*b"minf");
    pub const STBL: FourCc = FourCc(*b"stbl");
    pub const STCO: FourCc = FourCc(*b"stco");
    pub const CO64: FourCc = FourCc(*b"co64");
    pub const STTS: FourCc = FourCc(*b"stts");
    pub const STSC: FourCc = FourCc(*b"stsc");
    pub const UDTA: FourCc = FourCc(*b"udta");
    pub const META: FourCc = FourCc(*b"meta");
    pub const ILST: FourCc = FourCc(*b"ilst");
    pub const CHPL: FourCc = FourCc(*b"chpl");
    pub const DATA: FourCc = FourCc(*b"data");
    pub const MEAN: FourCc = FourCc(*b"mean");
    pub const NAME: FourCc = FourCc(*b"name");
    pub const FREEFORM: FourCc = FourCc(*b"----");
    pub const TITLE: FourCc = FourCc([0xA9, b'n', b'a', b'm']);
    pub const ARTIST: FourCc = FourCc([0xA9, b'A', b'R', b'T']);
    pub const ALBUM: FourCc = FourCc([0xA9, b'a', b'l', b'b']);
    pub const MOVEMENT_NAME: FourCc = FourCc([0xA9, b'm', b'v', b'n']);
    pub const MOVEMENT_INDEX: FourCc = FourCc([0xA9, b'm', b'v', b'i']);
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // bytes are ISO-8859-1 so that 0xA9 prints as '©'
        for byte in self.0 {
            write!(f, "{}", char::from(byte))?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({})", self)
    }
}

pub type BoxTree = Tree<FourCc>;

/// Boxes whose payload is a list of child boxes
fn is_container(kind: FourCc, parent: Option<FourCc>) -> bool {
    match kind {
        FourCc::MOOV
        | FourCc::TRAK
        | FourCc::TREF
        | FourCc::MDIA
        | FourCc::MINF
        | FourCc::STBL
        | FourCc::UDTA
        | FourCc::META
        | FourCc::ILST => true,
        // every ilst item holds data (and for "----" mean/name) boxes
        _ => parent == Some(FourCc::ILST),
    }
}

struct BoxHeader {
    kind: FourCc,
    payload_start: u64,
    end: u64,
}

/// Parser state for one walk over one file
struct Walker<'a, R: ?Sized> {
    reader: &'a mut R,
    limits: ReadLimits,
    tree: BoxTree,
}

impl<'a, R: Read + Seek + ?Sized> Walker<'a, R> {
    fn read_header(&mut self, position: u64, parent_end: u64) -> Result<BoxHeader> {
        self.reader.seek(SeekFrom::Start(position))?;
        let size = self.reader.read_u32::<BigEndian>()?;
        let mut kind = [0u8; 4];
        self.reader.read_exact(&mut kind)?;
        let kind = FourCc(kind);

        let (header_length, end) = match size {
            0 => (8, parent_end),
            1 => {
                let large = self.reader.read_u64::<BigEndian>()?;
                (16, position.saturating_add(large))
            }
            size => (8, position + u64::from(size)),
        };

        if end < position + header_length {
            return Err(ReadError::Structural(format!(
                "Box '{}' at {} is smaller than its header",
                kind, position
            )));
        }

        Ok(BoxHeader {
            kind,
            payload_start: position + header_length,
            end,
        })
    }

    /// Offset of the first child box inside a `meta` payload
    ///
    /// ISO `meta` is a full box (4 bytes version/flags before the
    /// children); QuickTime `meta` is a plain container. A plain container
    /// starts directly with a plausible child header.
    fn meta_children_start(&mut self, payload_start: u64, end: u64) -> Result<u64> {
        if end.saturating_sub(payload_start) < 8 {
            return Ok(payload_start);
        }
        self.reader.seek(SeekFrom::Start(payload_start))?;
        let size = u64::from(self.reader.read_u32::<BigEndian>()?);
        let mut kind = [0u8; 4];
        self.reader.read_exact(&mut kind)?;

        let plausible_child = size >= 8
            && size <= end - payload_start
            && kind.iter().all(|byte| byte.is_ascii_alphanumeric());
        Ok(if plausible_child { payload_start } else { payload_start + 4 })
    }

    fn walk(&mut self, parent: Option<NodeId>, start: u64, end: u64, depth: usize) -> Result<()> {
        self.limits.check_depth(depth)?;
        let parent_kind = parent.map(|id| self.tree.kind(id));

        let mut position = start;
        while end.saturating_sub(position) >= 8 {
            let header = match self.read_header(position, end) {
                Ok(header) => header,
                Err(e) => {
                    debug!(position, error = %e, "Unreadable box header, ending walk");
                    break;
                }
            };

            let mut box_end = header.end;
            if box_end > end {
                trace!(
                    kind = %header.kind,
                    declared_end = box_end,
                    parent_end = end,
                    "Box overruns its parent, clamping"
                );
                box_end = end;
            }

            let node = self
                .tree
                .push(parent, header.kind, header.payload_start..box_end);
            trace!(kind = %header.kind, start = header.payload_start, end = box_end, depth, "Box");

            if is_container(header.kind, parent_kind) {
                let children_start = if header.kind == FourCc::META {
                    self.meta_children_start(header.payload_start, box_end)?
                } else {
                    header.payload_start
                };
                self.walk(Some(node), children_start, box_end, depth + 1)?;
            }

            position = box_end;
        }
        Ok(())
    }
}

/// Parse the box hierarchy of a whole file
pub fn read_box_tree<R: Read + Seek + ?Sized>(
    reader: &mut R,
    limits: &ReadLimits,
) -> Result<BoxTree> {
    let total = stream_len(reader)?;
    let start = reader.stream_position()?;

    let mut walker = Walker {
        reader: &mut *reader,
        limits: *limits,
        tree: BoxTree::new(),
    };
    walker.walk(None, start, total, 0)?;

    debug!(boxes = walker.tree.len(), "Parsed MP4 box tree");
    Ok(walker.tree)
}

/// Read the payload of a box
pub fn read_payload<R: Read + Seek + ?Sized>(
    reader: &mut R,
    tree: &BoxTree,
    node: NodeId,
    limits: &ReadLimits,
) -> Result<Vec<u8>> {
    let range = &tree.node(node).range;
    read_at(reader, range.start, range.end - range.start, limits)
}
