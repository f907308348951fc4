//! NetCDF reader for gridded environmental datasets.
//!
//! Climate and pollution products (gridMET, WUSTL PM2.5) ship as NetCDF
//! files holding one or more named data variables on a regular
//! latitude/longitude grid, next to the 1-D coordinate variables that
//! describe that grid.
//!
//! [`GriddedFile`] exposes such a file as a set of named 2-D layers:
//!
//! - [`GriddedFile::variable_names`] lists every variable, coordinate axes
//!   included (callers filter with [`is_coordinate_name`])
//! - [`GriddedFile::read_layer`] reads one variable as a [`Layer`], slicing
//!   leading dimensions (time, band) at index 0 and turning fill values into
//!   `NaN`
//! - [`GriddedFile::transform`] derives the grid's affine transform from the
//!   coordinate axes
//!
//! The file handle is released when the `GriddedFile` is dropped.

pub mod error;
pub mod native;

use std::path::{Path, PathBuf};

use grid_processor::{AffineTransform, Layer};
use tracing::debug;

pub use error::{NetCdfError, NetCdfResult};
pub use native::silence_hdf5_errors;

/// Names (compared case-insensitively) of the longitude-like axis.
const LON_NAMES: [&str; 3] = ["lon", "longitude", "x"];

/// Names (compared case-insensitively) of the latitude-like axis.
const LAT_NAMES: [&str; 3] = ["lat", "latitude", "y"];

/// Whether a variable name denotes a coordinate axis rather than data.
pub fn is_coordinate_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    LON_NAMES.contains(&lower.as_str()) || LAT_NAMES.contains(&lower.as_str())
}

/// An open NetCDF dataset.
pub struct GriddedFile {
    file: netcdf::File,
    path: PathBuf,
}

impl GriddedFile {
    /// Open a NetCDF file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> NetCdfResult<Self> {
        // Silence HDF5's verbose stderr output for missing attributes
        silence_hdf5_errors();

        let path = path.as_ref();
        let file = netcdf::open(path).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to open NetCDF {}: {}", path.display(), e))
        })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path the dataset was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all variables in file order, coordinate axes included.
    pub fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|v| v.name()).collect()
    }

    /// Read a variable as a 2-D layer.
    ///
    /// The last two dimensions are rows and columns. Any leading dimensions
    /// are sliced at index 0. `scale_factor` and `add_offset` are applied;
    /// `_FillValue` and `missing_value` cells become `NaN`.
    pub fn read_layer(&self, name: &str) -> NetCdfResult<Layer> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| NetCdfError::MissingData(format!("variable {}", name)))?;

        let dims = var.dimensions();
        if dims.len() < 2 {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable {} has {} dimension(s), a grid needs at least 2",
                name,
                dims.len()
            )));
        }
        let height = dims[dims.len() - 2].len();
        let width = dims[dims.len() - 1].len();

        // Index 0 of every leading dimension, the full last two
        let leading = dims.len() - 2;
        let mut extents: Vec<netcdf::Extent> = vec![0usize.into(); leading];
        extents.push((..).into());
        extents.push((..).into());
        if leading > 0 {
            debug!(variable = %name, leading, "Slicing leading dimensions at index 0");
        }

        let raw: Vec<f32> = var
            .get_values(extents)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;

        let cells = width * height;
        if raw.len() != cells {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable {} returned {} values, expected {}",
                name,
                raw.len(),
                cells
            )));
        }

        let scale_factor = native::get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = native::get_f32_attr(&var, "add_offset").unwrap_or(0.0);
        let fill_value = native::get_f32_attr(&var, "_FillValue");
        let missing_value = native::get_f32_attr(&var, "missing_value");

        let data: Vec<f32> = raw
            .into_iter()
            .map(|val| {
                if Some(val) == fill_value || Some(val) == missing_value {
                    f32::NAN
                } else {
                    val * scale_factor + add_offset
                }
            })
            .collect();

        Ok(Layer::new(data, width, height)?)
    }

    /// Longitude and latitude axes as `(lons, lats)`, in array order.
    pub fn coordinate_axes(&self) -> NetCdfResult<(Vec<f64>, Vec<f64>)> {
        let lons = self.read_axis(&LON_NAMES)?;
        let lats = self.read_axis(&LAT_NAMES)?;
        Ok((lons, lats))
    }

    /// Affine transform of the native grid, derived from the coordinate axes.
    pub fn transform(&self) -> NetCdfResult<AffineTransform> {
        let (lons, lats) = self.coordinate_axes()?;
        Ok(AffineTransform::from_cell_centers(&lons, &lats)?)
    }

    fn read_axis(&self, candidates: &[&str]) -> NetCdfResult<Vec<f64>> {
        let var = self
            .file
            .variables()
            .find(|v| {
                v.dimensions().len() == 1 && candidates.contains(&v.name().to_lowercase().as_str())
            })
            .ok_or_else(|| {
                NetCdfError::MissingData(format!(
                    "coordinate axis ({}) in {}",
                    candidates.join("|"),
                    self.path.display()
                ))
            })?;

        let values: Vec<f64> = var.get_values(..).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to read {}: {}", var.name(), e))
        })?;

        let scale_factor = native::get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = native::get_f64_attr(&var, "add_offset").unwrap_or(0.0);
        Ok(values.iter().map(|v| v * scale_factor + add_offset).collect())
    }
}

impl std::fmt::Debug for GriddedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GriddedFile").field("path", &self.path).finish()
    }
}
