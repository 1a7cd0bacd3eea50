//! Container format identification
//!
//! Magic bytes decide first; the file extension is only consulted when the
//! header is not recognized (e.g. an MP3 without an ID3 tag is still
//! routed to the ID3 reader by its extension and yields no chapters).

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of header bytes [`ContainerFormat::detect`] looks at
pub const SIGNATURE_LENGTH: usize = 12;

/// Containers that can carry chapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// Matroska / WebM (EBML)
    Matroska,
    /// MP4 / QuickTime (M4A, M4B, MOV)
    Mp4,
    /// MP3 with an ID3v2 tag
    Id3,
}

impl ContainerFormat {
    /// Identify a container from its first bytes
    pub fn detect(header: &[u8]) -> Option<Self> {
        match header {
            [0x1A, 0x45, 0xDF, 0xA3, ..] => Some(ContainerFormat::Matroska),
            [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some(ContainerFormat::Mp4),
            [b'I', b'D', b'3', ..] => Some(ContainerFormat::Id3),
            _ => None,
        }
    }

    /// Identify a container from a file extension (case-insensitive, no dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "mka" | "mkv" | "webm" | "mk3d" => Some(ContainerFormat::Matroska),
            "m4a" | "m4b" | "mp4" | "mov" | "aac" => Some(ContainerFormat::Mp4),
            "mp3" => Some(ContainerFormat::Id3),
            _ => None,
        }
    }

    /// Identify a file by its signature, falling back to its extension
    ///
    /// `Ok(None)` when neither matches; `Err` only when the file cannot be
    /// opened or read.
    pub fn from_path(path: &Path) -> io::Result<Option<Self>> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; SIGNATURE_LENGTH];
        let mut filled = 0;
        while filled < buffer.len() {
            match file.read(&mut buffer[filled..])? {
                0 => break,
                n => filled += n,
            }
        }

        let by_extension = || {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(Self::from_extension)
        };
        Ok(Self::detect(&buffer[..filled]).or_else(by_extension))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContainerFormat::Matroska => "matroska",
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Id3 => "id3",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
