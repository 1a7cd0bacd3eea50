//! MP4 / M4B / QuickTime chapter extraction
//!
//! Two chapter mechanisms are tried in order; the first non-empty result
//! wins:
//!
//! 1. Nero `chpl` box with explicit `(start, title)` entries
//! 2. QuickTime chapter text track referenced by `trak/tref/chap`
//!
//! Tags come from `udta/meta/ilst`. A failure while reading tags is logged
//! and never affects the chapters.

pub mod boxes;
pub mod chapters;
pub mod meta;
pub mod sample_table;

use crate::codec::ReadLimits;
use crate::error::Result;
use crate::format::ContainerFormat;
use crate::source::{ByteSource, ChapterExtraction, ChapterSource};
use boxes::{read_box_tree, FourCc};
use chapmark_common::MediaTags;
use std::io::{Read, Seek};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct Mp4Reader {
    limits: ReadLimits,
}

impl Mp4Reader {
    pub fn new(limits: ReadLimits) -> Self {
        Self { limits }
    }

    pub fn read<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<ChapterExtraction> {
        let tree = read_box_tree(reader, &self.limits)?;
        if tree.child(None, FourCc::MOOV).is_none() {
            debug!("No moov box, no chapters");
            return Ok(ChapterExtraction::default());
        }

        let mut marks = chapters::nero_chapters(reader, &tree, &self.limits)?;
        if marks.is_empty() {
            marks = chapters::track_chapters(reader, &tree, &self.limits)?;
        }

        let tags = match meta::read_tags(reader, &tree, &self.limits) {
            Ok(tags) => tags,
            Err(e) => {
                warn!(error = %e, "Could not read MP4 metadata");
                MediaTags::default()
            }
        };

        debug!(marks = marks.len(), "Extracted MP4 chapters");
        Ok(ChapterExtraction::new(marks, tags))
    }
}

impl ChapterSource for Mp4Reader {
    fn format(&self) -> ContainerFormat {
        ContainerFormat::Mp4
    }

    fn extract(&self, source: &mut dyn ByteSource) -> Result<ChapterExtraction> {
        self.read(source)
    }
}
