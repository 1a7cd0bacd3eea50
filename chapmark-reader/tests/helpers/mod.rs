//! Test helpers for chapmark-reader integration tests
//!
//! In-memory fixture builders for each container plus tracing capture:
//! - ebml: Matroska element trees
//! - mp4: box trees, Nero chapters, chapter text tracks, ilst items
//! - id3: ID3v2 tags with CHAP and text frames
//! - log_capture: record events emitted while a closure runs

#![allow(dead_code)]

pub mod ebml;
pub mod id3;
pub mod log_capture;
pub mod mp4;

pub use log_capture::{capture_logs, LogCapture};
