//! Disaggregation of layers to a finer grid.
//!
//! Upscaling is the inverse of pyramid downsampling: every source cell is
//! replicated into a `factor x factor` block, so cell values are preserved
//! exactly and only the grid resolution changes. Zonal statistics over small
//! geometries (zip codes) then see fewer edge effects.

use tracing::debug;

use crate::error::{GridError, Result};
use crate::types::Layer;

/// Disaggregate a layer by an integer factor.
///
/// Produces a grid of size `(width * factor, height * factor)`. A factor of
/// 1 returns an identical copy; a factor of 0 is rejected.
pub fn disaggregate(layer: &Layer, factor: u32) -> Result<Layer> {
    if factor == 0 {
        return Err(GridError::InvalidFactor(factor));
    }
    if factor == 1 {
        return Ok(layer.clone());
    }

    let f = factor as usize;
    let width = layer.width();
    let new_width = width * f;
    let new_height = layer.height() * f;
    debug!(
        width,
        height = layer.height(),
        factor,
        "Disaggregating layer"
    );

    let mut output = Vec::with_capacity(new_width * new_height);
    for row in layer.data().chunks(width.max(1)) {
        let mut expanded = Vec::with_capacity(new_width);
        for &value in row {
            expanded.extend(std::iter::repeat(value).take(f));
        }
        for _ in 0..f {
            output.extend_from_slice(&expanded);
        }
    }

    Ok(Layer::new(output, new_width, new_height)?.with_scale(layer.scale() * factor))
}
