//! Chapter entity
//!
//! A `Chapter` is one audio file of a book: its persisted raw marks plus a
//! derived, lazily computed list of normalized chapter marks.
//!
//! Only the raw marks are persisted. Normalization is recomputed on read,
//! so changes to the normalization rules apply to previously scanned files
//! without a rescan.

use crate::marks::{ChapterMark, RawMark};
use crate::normalize::{normalize_with, NormalizeOptions};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// One audio file of a book, with its chapter marks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    /// Stable identifier (typically the file URI or path)
    pub id: String,

    /// Display name, also used as the fallback mark name
    pub name: String,

    duration_ms: i64,

    /// File modification time (ms since Unix epoch) at scan time
    pub file_last_modified_ms: i64,

    raw_marks: Vec<RawMark>,

    #[serde(skip)]
    chapter_marks: OnceCell<Vec<ChapterMark>>,
}

impl Chapter {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        duration_ms: i64,
        file_last_modified_ms: i64,
        raw_marks: Vec<RawMark>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_ms,
            file_last_modified_ms,
            raw_marks,
            chapter_marks: OnceCell::new(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn raw_marks(&self) -> &[RawMark] {
        &self.raw_marks
    }

    /// Replace the raw marks (e.g. after a rescan) and drop cached marks
    pub fn set_raw_marks(&mut self, raw_marks: Vec<RawMark>) {
        self.raw_marks = raw_marks;
        self.chapter_marks = OnceCell::new();
    }

    /// Update the duration and drop cached marks
    pub fn set_duration_ms(&mut self, duration_ms: i64) {
        self.duration_ms = duration_ms;
        self.chapter_marks = OnceCell::new();
    }

    /// Normalized marks, computed on first access with default options
    pub fn chapter_marks(&self) -> &[ChapterMark] {
        self.chapter_marks
            .get_or_init(|| self.chapter_marks_with(&NormalizeOptions::default()))
    }

    /// Normalized marks for custom options (not cached)
    pub fn chapter_marks_with(&self, options: &NormalizeOptions) -> Vec<ChapterMark> {
        normalize_with(&self.raw_marks, self.duration_ms, &self.name, options)
    }

    /// The mark containing `position_ms`
    ///
    /// Positions before the first mark resolve to the first mark, positions
    /// past the end to the last.
    pub fn mark_at(&self, position_ms: i64) -> &ChapterMark {
        &self.chapter_marks()[self.mark_index_at(position_ms)]
    }

    /// Index of the mark containing `position_ms`, see [`Chapter::mark_at`]
    pub fn mark_index_at(&self, position_ms: i64) -> usize {
        self.chapter_marks()
            .partition_point(|mark| mark.start_ms() <= position_ms)
            .saturating_sub(1)
    }
}

impl PartialEq for Chapter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.duration_ms == other.duration_ms
            && self.file_last_modified_ms == other.file_last_modified_ms
            && self.raw_marks == other.raw_marks
    }
}

impl Eq for Chapter {}
