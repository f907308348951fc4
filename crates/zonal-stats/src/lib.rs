//! Zonal statistics of raster layers over vector geometries.
//!
//! The aggregation core hands this crate a layer (or several layers on one
//! grid), the affine transform of that grid, and the path of a shapefile.
//! It gets back one record per geometry: the summary value(s) of the cells
//! belonging to that geometry plus the geometry's label (zip code, county
//! FIPS, ...).
//!
//! # Architecture
//!
//! ```text
//! ZonalStatistics::process_layers(strategy, shapefile, transform, layers, geography)
//!      │
//!      ├─► load_features(shapefile, geography, label_field)
//!      │
//!      ├─► per feature: select cells by strategy  (centre / all touched)
//!      │
//!      └─► per layer: reduce selected cells       (mean / max, NaN skipped)
//! ```
//!
//! Every layer of a multi-layer call sees the same cell selection for a
//! feature, and features are visited in shapefile order.

pub mod engine;
pub mod error;
pub mod geometry;
pub mod shapes;
pub mod types;

pub use engine::{compute_features, ShapefileEngine, ZonalStatistics};
pub use error::{Result, ZonalError};
pub use geometry::{Feature, Geometry};
pub use shapes::load_features;
pub use types::{Geography, MultiZonalRecord, RasterizationStrategy, StatisticsMode, ZonalRecord};
