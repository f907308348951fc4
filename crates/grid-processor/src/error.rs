//! Error types for grid processing.

use thiserror::Error;

/// Errors that can occur while building or transforming grids.
#[derive(Error, Debug)]
pub enum GridError {
    /// The data length does not match the declared dimensions.
    #[error("grid data has {actual} values but {width}x{height} requires {expected}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    /// A scale factor of zero was requested.
    #[error("invalid scale factor: {0}")]
    InvalidFactor(u32),

    /// The georeferencing information cannot produce a transform.
    #[error("invalid georeference: {0}")]
    InvalidGeoreference(String),
}

impl GridError {
    /// Create an InvalidGeoreference error.
    pub fn invalid_georeference(msg: impl Into<String>) -> Self {
        Self::InvalidGeoreference(msg.into())
    }
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
