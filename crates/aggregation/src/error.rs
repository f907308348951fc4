//! Error types for the aggregation crate.

use thiserror::Error;

use crate::engine::EngineState;

/// Errors that can occur while aggregating a task.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// A precondition of the run configuration is violated.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Requested variables are absent from the source, even ignoring case.
    #[error(
        "Variable(s) {requested:?} not found in the file {file}. Available variables: {}",
        .available.join(",")
    )]
    Resolution {
        requested: Vec<String>,
        file: String,
        available: Vec<String>,
    },

    /// A resolved name is missing at extraction time.
    #[error("Variable {name} is not in the dataset {file}")]
    Lookup { name: String, file: String },

    /// The raster file could not be read.
    #[error("Failed to read raster {file}: {message}")]
    Source { file: String, message: String },

    #[error("Grid error: {0}")]
    Grid(#[from] grid_processor::GridError),

    #[error("Zonal statistics failed: {0}")]
    Zonal(#[from] zonal_stats::ZonalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An engine operation was called out of order.
    #[error("Cannot {operation} while the engine is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
}

impl AggregationError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn source(file: &std::path::Path, message: impl ToString) -> Self {
        Self::Source {
            file: file.display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregationError>;
