//! Error types for zonal statistics.

use thiserror::Error;

/// Errors that can occur while computing zonal statistics.
#[derive(Error, Debug)]
pub enum ZonalError {
    /// The shapefile could not be read.
    #[error("failed to read shapefile {path}: {message}")]
    Shapefile { path: String, message: String },

    /// None of the candidate label fields exist on a record.
    #[error("no label field ({candidates}) in record {index} of {path}")]
    MissingLabel {
        path: String,
        index: usize,
        candidates: String,
    },

    /// A shape type other than polygons or points.
    #[error("unsupported shape type {0}")]
    UnsupportedShape(String),

    /// Layers passed together do not share one grid.
    #[error("layer {index} is {actual:?}, expected {expected:?}")]
    LayerShapeMismatch {
        index: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// An unrecognised strategy, geography or statistic name.
    #[error("unknown {kind}: {value}")]
    UnknownName { kind: &'static str, value: String },
}

/// Result type for zonal statistics operations.
pub type Result<T> = std::result::Result<T, ZonalError>;
