//! Error types for the relief library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading tiles or answering queries.
///
/// Missing tiles, points outside the configured coverage and exhausted void
/// searches are *not* errors: they surface as [`crate::DataQuality`] values
/// next to a default height. What remains here is the stuff a caller cannot
/// paper over.
#[derive(Error, Debug)]
pub enum ReliefError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tile data length doesn't match the configured resolution.
    #[error("Invalid tile size for {path}: {size} bytes (expected {expected})")]
    InvalidFileSize {
        path: PathBuf,
        size: usize,
        expected: usize,
    },

    /// A zip archive exists but cannot be read.
    #[error("Corrupt tile archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// Coordinates are outside the configured coverage box.
    #[error("Coordinates out of coverage: lat={lat}, lon={lon}")]
    OutOfCoverage { lat: f64, lon: f64 },

    /// Coordinates are not finite or outside ±90° / ±180°.
    #[error("Invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// A query option failed validation.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

/// Result type alias using [`ReliefError`].
pub type Result<T> = std::result::Result<T, ReliefError>;
