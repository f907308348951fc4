//! Raster aggregation pipeline.
//!
//! Turns gridded datasets (NetCDF) and band stacks (GeoTIFF) into per-geography
//! tables: one row per geometry, one value column per requested variable.
//!
//! # Architecture
//!
//! - [`resolver`] matches requested variable names against a source
//! - [`source`] opens a raster file and extracts named 2-D layers
//! - [`Resampler`] decides the upscaling factor for a strategy
//! - [`Aggregator`] runs one [`AggregationTask`] through its states
//! - [`OutputSink`] streams CSV rows, plain or gzip
//! - [`Pipeline`] executes a batch of tasks sequentially

pub mod config;
pub mod engine;
pub mod error;
pub mod exclude;
pub mod metadata;
pub mod pipeline;
pub mod profiling;
pub mod resample;
pub mod resolver;
pub mod sink;
pub mod source;
pub mod task;

// Re-exports
pub use config::{RunConfig, ShapeKind};
pub use engine::{Aggregator, EngineState, ExecutionOutcome};
pub use error::{AggregationError, Result};
pub use exclude::{exclude_rows, ExclusionSummary};
pub use metadata::{
    detect_source_kind, output_file_name, parse_wustl_period, sibling_output_path, SourceKind,
    WustlPeriod,
};
pub use pipeline::{batch_tasks, file_task, find_shape_file, wustl_task, Pipeline, PipelineReport};
pub use profiling::ProfilingData;
pub use resample::Resampler;
pub use resolver::resolve_variables;
pub use sink::{OpenMode, OutputSink};
pub use source::{open_source, BandStackSource, GriddedSource, LayerSource};
pub use task::{AggregationTask, ExtraColumn};

pub use zonal_stats::{Geography, RasterizationStrategy, StatisticsMode};
