//! Error types for instview-rs.

use thiserror::Error;

use crate::geometry::DetectorId;

/// The main error type for instview-rs operations.
#[derive(Error, Debug)]
pub enum InstviewError {
    /// Assembly was requested before the detector transform table was built.
    #[error("instrument not precomputed - call precompute() before assembling")]
    NotPrecomputed,

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A detector ID is not known to the loaded instrument.
    #[error("detector id {0} not found in instrument")]
    UnknownDetectorId(DetectorId),

    /// The geometry model could not produce a mesh for a detector shape.
    #[error("shape extraction failed: {0}")]
    ShapeExtraction(String),

    /// An element index was outside the valid range.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A quantity with the given name was not found.
    #[error("quantity '{0}' not found on structure '{1}'")]
    QuantityNotFound(String, String),

    /// The operation needs an overlay that has not been built.
    #[error("no overlay built - assemble a detector subset first")]
    NoOverlay,

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for instview-rs operations.
pub type Result<T> = std::result::Result<T, InstviewError>;

/// Returns a [`InstviewError::SizeMismatch`] unless `actual == expected`.
pub fn ensure_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(InstviewError::SizeMismatch { expected, actual })
    }
}
