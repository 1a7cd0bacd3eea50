//! Integer codecs and bounded reads
//!
//! - EBML variable-length integers (element ids keep their marker bits,
//!   element sizes strip them; an all-ones size means "unknown")
//! - ID3v2 synchsafe integers (7 significant bits per byte)
//! - Fixed-width big-endian integers of 0..=8 bytes
//!
//! Every payload read goes through [`ReadLimits`] so that a corrupt size
//! field cannot trigger a huge allocation.

use crate::error::{ReadError, Result};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use chapmark_common::config::{ScannerConfig, DEFAULT_MAX_PAYLOAD_BYTES};
use std::io::{Read, Seek, SeekFrom};

/// Deepest element/box nesting a tree walker descends into
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Resource bounds applied while reading one container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub max_payload_bytes: u64,
    pub max_depth: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl From<&ScannerConfig> for ReadLimits {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
            ..Self::default()
        }
    }
}

impl ReadLimits {
    pub fn check_payload(&self, size: u64) -> Result<()> {
        if size > self.max_payload_bytes {
            return Err(ReadError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    pub fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(ReadError::Structural(format!(
                "Nesting deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }
}

/// Decode a 28-bit synchsafe integer
pub fn synchsafe_u32(raw: u32) -> u32 {
    ((raw & 0x7F00_0000) >> 3)
        | ((raw & 0x007F_0000) >> 2)
        | ((raw & 0x0000_7F00) >> 1)
        | (raw & 0x7F)
}

/// Total length in bytes of a vint, from its first byte
fn vint_length(first: u8) -> Option<u8> {
    if first == 0 {
        None
    } else {
        Some(first.leading_zeros() as u8 + 1)
    }
}

/// Read an EBML element id (marker bits kept)
///
/// Returns the id and its encoded length. Ids are at most 4 bytes long.
pub fn read_ebml_id<R: Read + ?Sized>(reader: &mut R) -> Result<(u32, u8)> {
    let first = reader.read_u8()?;
    let length = vint_length(first)
        .filter(|length| *length <= 4)
        .ok_or_else(|| {
            ReadError::Structural(format!("Invalid element id lead byte 0x{:02X}", first))
        })?;

    let mut id = u32::from(first);
    for _ in 1..length {
        id = (id << 8) | u32::from(reader.read_u8()?);
    }
    Ok((id, length))
}

/// Read an EBML element size (marker bits stripped)
///
/// Returns `None` for the reserved all-ones "unknown size" value, plus the
/// encoded length.
pub fn read_ebml_size<R: Read + ?Sized>(reader: &mut R) -> Result<(Option<u64>, u8)> {
    let first = reader.read_u8()?;
    let length = vint_length(first).ok_or_else(|| {
        ReadError::Structural("Invalid element size lead byte 0x00".to_string())
    })?;

    let mask = if length == 8 { 0 } else { 0xFF_u8 >> length };
    let mut value = u64::from(first & mask);
    let mut all_ones = first & mask == mask;
    for _ in 1..length {
        let byte = reader.read_u8()?;
        all_ones &= byte == 0xFF;
        value = (value << 8) | u64::from(byte);
    }

    Ok((if all_ones { None } else { Some(value) }, length))
}

/// Big-endian unsigned integer of 0..=8 bytes (0 bytes decode as 0)
pub fn be_uint(bytes: &[u8]) -> Option<u64> {
    match bytes.len() {
        0 => Some(0),
        1..=8 => Some(BigEndian::read_uint(bytes, bytes.len())),
        _ => None,
    }
}

/// Read exactly `size` bytes, bounded by the payload limit
pub fn read_payload<R: Read + ?Sized>(
    reader: &mut R,
    size: u64,
    limits: &ReadLimits,
) -> Result<Vec<u8>> {
    limits.check_payload(size)?;
    let mut buffer = vec![0; size as usize];
    reader.read_exact(&mut buffer)?;
    Ok(buffer)
}

/// Read up to `size` bytes, stopping early at end of input
pub fn read_available<R: Read + ?Sized>(
    reader: &mut R,
    size: u64,
    limits: &ReadLimits,
) -> Result<Vec<u8>> {
    limits.check_payload(size)?;
    let mut buffer = Vec::with_capacity(size as usize);
    reader.take(size).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Read `size` bytes at absolute `offset`
pub fn read_at<R: Read + Seek + ?Sized>(
    reader: &mut R,
    offset: u64,
    size: u64,
    limits: &ReadLimits,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    read_payload(reader, size, limits)
}

/// Total length of a seekable source; the position is restored
pub fn stream_len<R: Seek + ?Sized>(reader: &mut R) -> Result<u64> {
    let position = reader.stream_position()?;
    let length = reader.seek(SeekFrom::End(0))?;
    if position != length {
        reader.seek(SeekFrom::Start(position))?;
    }
    Ok(length)
}
