//! NetCDF datasets with named variables.

use std::path::Path;

use grid_processor::{AffineTransform, Layer};
use netcdf_parser::{is_coordinate_name, GriddedFile, NetCdfError};
use tracing::info;

use crate::error::{AggregationError, Result};
use crate::metadata::SourceKind;
use crate::source::LayerSource;

/// A NetCDF file whose variables are addressed by name.
#[derive(Debug)]
pub struct GriddedSource {
    file: GriddedFile,
    names: Vec<String>,
}

impl GriddedSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = GriddedFile::open(path).map_err(|e| AggregationError::source(path, e))?;
        let names = file.variable_names();
        Ok(Self { file, names })
    }
}

impl LayerSource for GriddedSource {
    fn path(&self) -> &Path {
        self.file.path()
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Gridded
    }

    fn available_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn transform(&self) -> Result<AffineTransform> {
        self.file.transform().map_err(|e| match e {
            NetCdfError::Grid(grid) => AggregationError::Grid(grid),
            other => AggregationError::source(self.path(), other),
        })
    }

    fn extract(&self, name: &str) -> Result<Layer> {
        if is_coordinate_name(name) || !self.names.iter().any(|n| n == name) {
            return Err(AggregationError::Lookup {
                name: name.to_string(),
                file: self.path().display().to_string(),
            });
        }

        info!(variable = %name, "Extracting layer");
        self.file
            .read_layer(name)
            .map_err(|e| AggregationError::source(self.path(), e))
    }
}
