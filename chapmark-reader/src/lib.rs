//! # Chapmark Reader
//!
//! Chapter extraction from audio containers:
//! - Matroska / WebM (EBML `Chapters` and `Tags`)
//! - MP4 / QuickTime (Nero `chpl` atom, QuickTime chapter text track, `ilst` tags)
//! - MP3 (ID3v2 `CHAP` frames)
//! - Vorbis comment `CHAPTERnnn` pairs
//!
//! Readers produce raw marks; normalization into a contiguous timeline
//! lives in `chapmark_common::normalize`. [`ChapterScanner`] is the entry
//! point for callers and never fails.

pub mod codec;
pub mod ebml;
pub mod error;
pub mod format;
pub mod id3;
pub mod matroska;
pub mod mp4;
pub mod scanner;
pub mod source;
pub mod text;
pub mod tree;
pub mod vorbis;

pub use codec::ReadLimits;
pub use error::{ReadError, Result};
pub use format::ContainerFormat;
pub use id3::Id3Reader;
pub use matroska::MatroskaReader;
pub use mp4::Mp4Reader;
pub use scanner::ChapterScanner;
pub use source::{ByteSource, ChapterExtraction, ChapterSource};
pub use vorbis::chapters_from_comments;
