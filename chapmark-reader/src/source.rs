//! Common reader capability

use crate::error::Result;
use crate::format::ContainerFormat;
use chapmark_common::{MediaTags, RawMark};
use std::io::{Read, Seek};

/// A seekable byte source
///
/// Implemented for every `Read + Seek` type (files, cursors, buffered
/// readers) so readers can be used through `&mut dyn ByteSource`.
pub trait ByteSource: Read + Seek {}

impl<T: Read + Seek + ?Sized> ByteSource for T {}

/// Raw chapter marks plus the incidental tags found next to them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterExtraction {
    pub marks: Vec<RawMark>,
    pub tags: MediaTags,
}

impl ChapterExtraction {
    pub fn new(marks: Vec<RawMark>, tags: MediaTags) -> Self {
        Self { marks, tags }
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty() && self.tags.is_empty()
    }
}

/// A container reader producing raw chapter marks
///
/// Implementations hold only configuration; all parser state lives in the
/// call, so one reader can serve many threads.
pub trait ChapterSource: Send + Sync {
    fn format(&self) -> ContainerFormat;

    /// Read chapters and tags from `source`, starting at its current position
    fn extract(&self, source: &mut dyn ByteSource) -> Result<ChapterExtraction>;
}
