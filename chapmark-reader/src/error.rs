//! Reader error types

use thiserror::Error;

/// Result type for container readers
pub type Result<T> = std::result::Result<T, ReadError>;

/// Errors raised while reading a container
///
/// None of these escape [`crate::ChapterScanner`]; they are logged and
/// turned into an empty extraction there.
#[derive(Error, Debug)]
pub enum ReadError {
    /// Underlying byte source failure, including truncated input
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Magic bytes or mandatory header fields do not match the format
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Inconsistent sizes, missing mandatory elements, excessive nesting
    #[error("Structural error: {0}")]
    Structural(String),

    /// A declared payload exceeds the configured read limit
    #[error("Payload of {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Recognized but unsupported variant (e.g. an EBML `DocType` other than Matroska or WebM)
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl ReadError {
    /// Whether the error stems from the byte source rather than the content
    pub fn is_io(&self) -> bool {
        matches!(self, ReadError::Io(_))
    }
}
