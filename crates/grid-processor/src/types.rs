//! Core types for grid processing.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// A geographic bounding box in the raster's coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing all the given points, `None` when empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut bbox = Self::new(x, y, x, y);
        for (x, y) in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    /// Check if this bounding box intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }

    /// Check if a point is contained within this bounding box.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Get the width in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Get the height in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// An immutable 2-D numeric grid for one variable at one point in time.
///
/// Values are stored row-major, row 0 first. Missing cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    data: Vec<f32>,
    width: usize,
    height: usize,
    scale: u32,
}

impl Layer {
    /// Create a native-resolution layer, checking the data length.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected {
            return Err(GridError::DimensionMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            scale: 1,
        })
    }

    pub(crate) fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Get the value at a specific grid coordinate.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Row-major cell values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Upscaling factor relative to the source grid (1 = native).
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Get the total number of grid points.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the layer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Maps array indices to coordinates for one raster at one scale.
///
/// Follows the GDAL convention: `x = a*col + b*row + c`,
/// `y = d*col + e*row + f`, where `(col, row)` is the top-left corner of a
/// cell. Rasters in this domain are never rotated, so `b` and `d` are zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    /// X coordinate of the grid's outer corner.
    pub origin_x: f64,
    /// Y coordinate of the grid's outer corner.
    pub origin_y: f64,
    /// Cell size along columns.
    pub pixel_width: f64,
    /// Cell size along rows; negative for north-up grids.
    pub pixel_height: f64,
    scale: u32,
}

impl AffineTransform {
    /// Create a transform from the outer corner and the signed cell size.
    pub fn from_origin(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            scale: 1,
        }
    }

    /// Derive a transform from coordinate axes of cell centres.
    ///
    /// `xs` are the column centres and `ys` the row centres, in array order.
    /// Both axes need at least two regularly spaced entries.
    pub fn from_cell_centers(xs: &[f64], ys: &[f64]) -> Result<Self> {
        let dx = axis_step(xs, "x")?;
        let dy = axis_step(ys, "y")?;
        Ok(Self::from_origin(xs[0] - dx / 2.0, ys[0] - dy / 2.0, dx, dy))
    }

    /// The same geometry at `factor` times the resolution.
    pub fn scaled(&self, factor: u32) -> Result<Self> {
        if factor == 0 {
            return Err(GridError::InvalidFactor(factor));
        }
        Ok(Self {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            pixel_width: self.pixel_width / factor as f64,
            pixel_height: self.pixel_height / factor as f64,
            scale: self.scale * factor,
        })
    }

    /// Upscaling factor relative to the source grid (1 = native).
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Coordinates of the top-left corner of a cell.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Coordinates of the centre of a cell.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Bounding box of a single cell.
    pub fn cell_bounds(&self, col: usize, row: usize) -> BoundingBox {
        let (x0, y0) = self.apply(col as f64, row as f64);
        let (x1, y1) = self.apply(col as f64 + 1.0, row as f64 + 1.0);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Fractional `(col, row)` position of a coordinate.
    pub fn to_index(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Cell containing a coordinate, if it falls inside a `width` x `height` grid.
    pub fn cell_at(&self, x: f64, y: f64, width: usize, height: usize) -> Option<(usize, usize)> {
        let (col, row) = self.to_index(x, y);
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (col, row) = (col.floor() as usize, row.floor() as usize);
        (col < width && row < height).then_some((col, row))
    }

    /// Extent covered by a `width` x `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (x0, y0) = self.apply(0.0, 0.0);
        let (x1, y1) = self.apply(width as f64, height as f64);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

fn axis_step(axis: &[f64], name: &str) -> Result<f64> {
    if axis.len() < 2 {
        return Err(GridError::invalid_georeference(format!(
            "{} axis needs at least 2 values, found {}",
            name,
            axis.len()
        )));
    }
    let step = (axis[axis.len() - 1] - axis[0]) / (axis.len() - 1) as f64;
    if step == 0.0 || !step.is_finite() {
        return Err(GridError::invalid_georeference(format!(
            "{} axis has no extent",
            name
        )));
    }
    Ok(step)
}
