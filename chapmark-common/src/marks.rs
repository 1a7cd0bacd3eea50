//! Chapter mark data model
//!
//! Two representations flow through chapmark:
//!
//! 1. **Raw marks**: `(start_ms, name)` pairs exactly as a container parser
//!    found them. Unvalidated, unordered, possibly duplicated or negative.
//!    This is what gets persisted.
//! 2. **Chapter marks**: validated, contiguous spans produced by
//!    [`crate::normalize`]. Recomputed from raw marks whenever needed.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// An unvalidated chapter start as produced by a container reader
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawMark {
    /// Start offset in milliseconds (may be negative or otherwise invalid)
    pub start_ms: i64,

    /// Chapter name
    pub name: String,
}

impl RawMark {
    pub fn new(start_ms: i64, name: impl Into<String>) -> Self {
        Self {
            start_ms,
            name: name.into(),
        }
    }
}

/// A normalized, non-overlapping chapter span
///
/// Guaranteed to satisfy `start_ms < end_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChapterMark {
    name: String,
    start_ms: i64,
    end_ms: i64,
}

impl ChapterMark {
    /// Create a chapter mark
    ///
    /// # Errors
    /// Returns [`Error::InvalidMark`] if `start_ms >= end_ms`.
    pub fn new(name: impl Into<String>, start_ms: i64, end_ms: i64) -> Result<Self> {
        let name = name.into();
        if start_ms >= end_ms {
            return Err(Error::InvalidMark {
                name,
                start_ms,
                end_ms,
            });
        }
        Ok(Self {
            name,
            start_ms,
            end_ms,
        })
    }

    /// Span constructor for callers that established `start_ms < end_ms` themselves
    pub(crate) fn spanning(name: String, start_ms: i64, end_ms: i64) -> Self {
        debug_assert!(start_ms < end_ms, "span {start_ms}..{end_ms} is empty");
        Self {
            name,
            start_ms,
            end_ms,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    /// Whether `position_ms` falls inside this mark (both bounds inclusive)
    pub fn contains(&self, position_ms: i64) -> bool {
        position_ms >= self.start_ms && position_ms <= self.end_ms
    }
}

impl From<&ChapterMark> for RawMark {
    fn from(mark: &ChapterMark) -> Self {
        RawMark::new(mark.start_ms, mark.name.clone())
    }
}

/// Incidental tags found alongside chapters
///
/// Consumed by the scanning collaborator to populate book metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub series: Option<String>,
    pub part: Option<String>,
}

impl MediaTags {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.series.is_none()
            && self.part.is_none()
    }

    /// Fill every missing field from `other`, keeping the values already present
    pub fn merge_missing(&mut self, other: MediaTags) {
        self.title = self.title.take().or(other.title);
        self.artist = self.artist.take().or(other.artist);
        self.album = self.album.take().or(other.album);
        self.series = self.series.take().or(other.series);
        self.part = self.part.take().or(other.part);
    }
}
