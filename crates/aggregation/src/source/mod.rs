//! Raster sources exposing named 2-D layers.
//!
//! Both variants read the whole file on open or keep a handle to it; either
//! way every resource is released when the source is dropped, which happens
//! when the owning [`Aggregator`](crate::Aggregator) finishes or fails.

mod band_stack;
mod gridded;

use std::path::Path;

use grid_processor::{AffineTransform, Layer};

use crate::error::Result;
use crate::metadata::{detect_source_kind, SourceKind};

pub use band_stack::BandStackSource;
pub use gridded::GriddedSource;

/// An opened raster file.
pub trait LayerSource {
    /// File the source was opened from.
    fn path(&self) -> &Path;

    fn kind(&self) -> SourceKind;

    /// Every name `extract` may be asked for. Gridded sources include their
    /// coordinate axes.
    fn available_names(&self) -> Vec<String>;

    /// Affine transform of the native grid.
    fn transform(&self) -> Result<AffineTransform>;

    /// Read one layer at native resolution. Names must match exactly.
    fn extract(&self, name: &str) -> Result<Layer>;
}

/// Open a raster file with the variant its extension selects.
pub fn open_source(path: &Path) -> Result<Box<dyn LayerSource>> {
    match detect_source_kind(path)? {
        SourceKind::Gridded => Ok(Box::new(GriddedSource::open(path)?)),
        SourceKind::BandStack => Ok(Box::new(BandStackSource::open(path)?)),
    }
}
