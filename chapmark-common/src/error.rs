//! Common error types for chapmark

use thiserror::Error;

/// Common result type for chapmark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across chapmark crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A chapter mark whose start is not before its end
    #[error("Invalid chapter mark '{name}': start {start_ms} is not before end {end_ms}")]
    InvalidMark {
        name: String,
        start_ms: i64,
        end_ms: i64,
    },
}
