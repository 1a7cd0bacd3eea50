//! # Chapmark Common Library
//!
//! Shared code for the chapmark crates including:
//! - Chapter data model (raw marks, normalized marks, chapter entity)
//! - Chapter mark normalization
//! - Configuration loading
//! - Logging initialization
//! - Time and language utilities

pub mod chapter;
pub mod config;
pub mod error;
pub mod language;
pub mod logging;
pub mod marks;
pub mod normalize;
pub mod time;

pub use chapter::Chapter;
pub use error::{Error, Result};
pub use marks::{ChapterMark, MediaTags, RawMark};
pub use normalize::{normalize, normalize_with, NormalizeOptions};
