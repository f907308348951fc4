//! Fake zonal-statistics engine shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use grid_processor::{AffineTransform, Layer};
use zonal_stats::{
    Geography, MultiZonalRecord, RasterizationStrategy, Result, ZonalRecord, ZonalStatistics,
};

/// What one engine call received.
#[derive(Debug, Clone)]
pub struct Call {
    pub multi: bool,
    pub shapefile: PathBuf,
    pub strategy: RasterizationStrategy,
    pub geography: Geography,
    pub transform_scale: u32,
    pub layer_scales: Vec<u32>,
    pub layer_shapes: Vec<(usize, usize)>,
}

/// Reports the mean of every valid cell for each configured label.
pub struct MeanEngine {
    labels: Vec<String>,
    pub calls: RefCell<Vec<Call>>,
}

impl MeanEngine {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn record(
        &self,
        multi: bool,
        strategy: RasterizationStrategy,
        shapefile: &Path,
        transform: &AffineTransform,
        layers: &[Layer],
        geography: Geography,
    ) {
        self.calls.borrow_mut().push(Call {
            multi,
            shapefile: shapefile.to_path_buf(),
            strategy,
            geography,
            transform_scale: transform.scale(),
            layer_scales: layers.iter().map(Layer::scale).collect(),
            layer_shapes: layers.iter().map(|l| (l.width(), l.height())).collect(),
        });
    }
}

fn mean(layer: &Layer) -> f64 {
    let valid: Vec<f64> = layer
        .data()
        .iter()
        .filter(|v| !v.is_nan())
        .map(|&v| f64::from(v))
        .collect();
    if valid.is_empty() {
        f64::NAN
    } else {
        valid.iter().sum::<f64>() / valid.len() as f64
    }
}

impl ZonalStatistics for MeanEngine {
    fn process(
        &self,
        strategy: RasterizationStrategy,
        shapefile: &Path,
        transform: &AffineTransform,
        layer: &Layer,
        geography: Geography,
    ) -> Result<Vec<ZonalRecord>> {
        self.record(
            false,
            strategy,
            shapefile,
            transform,
            std::slice::from_ref(layer),
            geography,
        );
        Ok(self
            .labels
            .iter()
            .map(|label| ZonalRecord {
                value: mean(layer),
                label: label.clone(),
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
        self.record(true, strategy, shapefile, transform, layers, geography);
        Ok(self
            .labels
            .iter()
            .map(|label| MultiZonalRecord {
                values: layers.iter().map(mean).collect(),
                label: label.clone(),
            })
            .collect())
    }
}
