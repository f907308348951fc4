//! The zonal-statistics engine.

use std::path::Path;

use grid_processor::{AffineTransform, Layer};
use tracing::debug;

use crate::error::{Result, ZonalError};
use crate::geometry::{Feature, Geometry};
use crate::shapes::load_features;
use crate::types::{
    Geography, MultiZonalRecord, RasterizationStrategy, StatisticsMode, ZonalRecord,
};

/// Computes per-geometry statistics of raster layers.
///
/// Both calls yield one record per geometry of the shapefile, in the same
/// order. `process_layers` evaluates all layers against one cell selection
/// per geometry, so values for one geometry land in one record.
pub trait ZonalStatistics {
    /// Statistics of a single layer.
    fn process(
        &self,
        strategy: RasterizationStrategy,
        shapefile: &Path,
        transform: &AffineTransform,
        layer: &Layer,
        geography: Geography,
    ) -> Result<Vec<ZonalRecord>>;

    /// Statistics of several layers sharing one grid.
    fn process_layers(
        &self,
        strategy: RasterizationStrategy,
        shapefile: &Path,
        transform: &AffineTransform,
        layers: &[Layer],
        geography: Geography,
    ) -> Result<Vec<MultiZonalRecord>>;
}

/// Engine reading geometries and labels from an ESRI shapefile.
#[derive(Debug, Clone, Default)]
pub struct ShapefileEngine {
    statistic: StatisticsMode,
    label_field: Option<String>,
}

impl ShapefileEngine {
    pub fn new(statistic: StatisticsMode) -> Self {
        Self {
            statistic,
            label_field: None,
        }
    }

    /// Read labels from this attribute instead of the geography's defaults.
    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }
}

impl ZonalStatistics for ShapefileEngine {
    fn process(
        &self,
        strategy: RasterizationStrategy,
        shapefile: &Path,
        transform: &AffineTransform,
        layer: &Layer,
        geography: Geography,
    ) -> Result<Vec<ZonalRecord>> {
        let records = self.process_layers(
            strategy,
            shapefile,
            transform,
            std::slice::from_ref(layer),
            geography,
        )?;
        Ok(records
            .into_iter()
            .map(|r| ZonalRecord {
                value: r.values[0],
                label: r.label,
            })
            .collect())
    }

    fn process_layers(
        &self,
        strategy: RasterizationStrategy,
        shapefile: &Path,
        transform: &AffineTransform,
        layers: &[Layer],
        geography: Geography,
    ) -> Result<Vec<MultiZonalRecord>> {
        let features = load_features(shapefile, geography, self.label_field.as_deref())?;
        debug!(
            shapefile = %shapefile.display(),
            features = features.len(),
            layers = layers.len(),
            strategy = %strategy,
            "Computing zonal statistics"
        );
        compute_features(&features, transform, layers, strategy, self.statistic)
    }
}

/// Compute statistics of `layers` for already-loaded features.
pub fn compute_features(
    features: &[Feature],
    transform: &AffineTransform,
    layers: &[Layer],
    strategy: RasterizationStrategy,
    statistic: StatisticsMode,
) -> Result<Vec<MultiZonalRecord>> {
    let Some(first) = layers.first() else {
        return Ok(features
            .iter()
            .map(|f| MultiZonalRecord {
                values: Vec::new(),
                label: f.label.clone(),
            })
            .collect());
    };

    let shape = (first.width(), first.height());
    for (index, layer) in layers.iter().enumerate() {
        if (layer.width(), layer.height()) != shape {
            return Err(ZonalError::LayerShapeMismatch {
                index,
                expected: shape,
                actual: (layer.width(), layer.height()),
            });
        }
    }

    let records = features
        .iter()
        .map(|feature| {
            let values = match strategy {
                RasterizationStrategy::Default | RasterizationStrategy::Downscale => {
                    let cells = select_cells(&feature.geometry, transform, shape, false);
                    layers.iter().map(|l| reduce(l, &cells, statistic)).collect()
                }
                RasterizationStrategy::AllTouched => {
                    let cells = select_cells(&feature.geometry, transform, shape, true);
                    layers.iter().map(|l| reduce(l, &cells, statistic)).collect()
                }
                RasterizationStrategy::Combined | RasterizationStrategy::Auto => {
                    let centre = select_cells(&feature.geometry, transform, shape, false);
                    let touched = select_cells(&feature.geometry, transform, shape, true);
                    layers
                        .iter()
                        .map(|l| {
                            combine(reduce(l, &centre, statistic), reduce(l, &touched, statistic))
                        })
                        .collect()
                }
            };
            MultiZonalRecord {
                values,
                label: feature.label.clone(),
            }
        })
        .collect();

    Ok(records)
}

/// Flat indices of the cells belonging to a geometry.
fn select_cells(
    geometry: &Geometry,
    transform: &AffineTransform,
    (width, height): (usize, usize),
    all_touched: bool,
) -> Vec<usize> {
    if let Geometry::Point(x, y) = geometry {
        return transform
            .cell_at(*x, *y, width, height)
            .map(|(col, row)| vec![row * width + col])
            .unwrap_or_default();
    }

    let Some(bbox) = geometry.bounds() else {
        return Vec::new();
    };

    // Candidate window: the cells under the geometry's bounding box
    let (c0, r0) = transform.to_index(bbox.min_x, bbox.min_y);
    let (c1, r1) = transform.to_index(bbox.max_x, bbox.max_y);
    let col_start = c0.min(c1).floor().max(0.0) as usize;
    let row_start = r0.min(r1).floor().max(0.0) as usize;
    let col_end = (c0.max(c1).ceil().max(0.0) as usize).min(width);
    let row_end = (r0.max(r1).ceil().max(0.0) as usize).min(height);

    let mut cells = Vec::new();
    for row in row_start..row_end {
        for col in col_start..col_end {
            let (cx, cy) = transform.cell_center(col, row);
            let selected = geometry.contains(cx, cy)
                || (all_touched && touches(geometry, transform, col, row));
            if selected {
                cells.push(row * width + col);
            }
        }
    }
    cells
}

/// Approximate touch test: a cell corner inside the polygon, or a polygon
/// vertex inside the cell.
fn touches(geometry: &Geometry, transform: &AffineTransform, col: usize, row: usize) -> bool {
    let cell = transform.cell_bounds(col, row);
    let corners = [
        (cell.min_x, cell.min_y),
        (cell.min_x, cell.max_y),
        (cell.max_x, cell.min_y),
        (cell.max_x, cell.max_y),
    ];
    corners.iter().any(|&(x, y)| geometry.contains(x, y)) || geometry.has_vertex_in(&cell)
}

fn reduce(layer: &Layer, cells: &[usize], statistic: StatisticsMode) -> f64 {
    let values = cells
        .iter()
        .filter_map(|&i| layer.data().get(i).copied())
        .filter(|v| !v.is_nan())
        .map(f64::from);

    match statistic {
        StatisticsMode::Mean => {
            let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        }
        StatisticsMode::Max => values.fold(f64::NAN, f64::max),
    }
}

fn combine(centre: f64, touched: f64) -> f64 {
    match (centre.is_nan(), touched.is_nan()) {
        (false, false) => (centre + touched) / 2.0,
        (true, _) => touched,
        (false, true) => centre,
    }
}
