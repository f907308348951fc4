//! Grid primitives for raster aggregation.
//!
//! This crate holds the numeric building blocks shared by every raster
//! source and by the zonal-statistics engine:
//!
//! - **Layers**: immutable 2-D `f32` grids in row-major order
//! - **Affine transforms**: mapping between array indices and geographic
//!   coordinates, scaled together with the layers they describe
//! - **Disaggregation**: nearest-neighbour upscaling of a layer by an
//!   integer factor
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{disaggregate, AffineTransform, Layer};
//!
//! let layer = Layer::new(vec![1.0, 2.0, 3.0, 4.0], 2, 2)?;
//! let transform = AffineTransform::from_origin(-100.0, 40.0, 0.5, -0.5);
//!
//! // Both sides of the pair must use the same factor
//! let fine = disaggregate(&layer, 5)?;
//! let fine_transform = transform.scaled(5)?;
//! assert_eq!(fine.scale(), fine_transform.scale());
//! ```

pub mod error;
pub mod resample;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{GridError, Result};
pub use resample::disaggregate;
pub use types::{AffineTransform, BoundingBox, Layer};
