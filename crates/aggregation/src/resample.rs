//! Choosing the resampling factor for a task.

use grid_processor::{disaggregate, AffineTransform, GridError, Layer};
use tracing::info;

use crate::error::Result;
use zonal_stats::RasterizationStrategy;

/// Upscales layers and their transform by one factor.
///
/// A task builds one resampler up front and routes every layer and the
/// transform through it, so geometry and values always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    factor: u32,
}

impl Resampler {
    /// `downscale` upsamples by [`RasterizationStrategy::DOWNSCALE_FACTOR`];
    /// every other strategy works on the native grid.
    pub fn for_strategy(strategy: RasterizationStrategy) -> Self {
        Self {
            factor: strategy.scale_factor(),
        }
    }

    pub fn with_factor(factor: u32) -> Result<Self> {
        if factor == 0 {
            return Err(GridError::InvalidFactor(factor).into());
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> u32 {
        self.factor
    }

    /// The native transform at this resampler's resolution.
    pub fn transform(&self, native: &AffineTransform) -> Result<AffineTransform> {
        Ok(native.scaled(self.factor)?)
    }

    /// The layer at this resampler's resolution; factor 1 hands it back
    /// untouched.
    pub fn resample(&self, layer: Layer) -> Result<Layer> {
        if self.factor == 1 {
            return Ok(layer);
        }
        info!(factor = self.factor, "Downscaling by the factor of {}", self.factor);
        Ok(disaggregate(&layer, self.factor)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, create_test_grid};

    fn layer() -> Layer {
        Layer::new(create_test_grid(3, 2), 3, 2).unwrap()
    }

    #[test]
    fn test_factor_from_strategy() {
        assert_eq!(
            Resampler::for_strategy(RasterizationStrategy::Downscale).factor(),
            5
        );
        for strategy in [
            RasterizationStrategy::Default,
            RasterizationStrategy::AllTouched,
            RasterizationStrategy::Combined,
            RasterizationStrategy::Auto,
        ] {
            assert_eq!(Resampler::for_strategy(strategy).factor(), 1);
        }
    }

    #[test]
    fn test_factor_one_is_identity() {
        let resampler = Resampler::with_factor(1).unwrap();
        assert_eq!(resampler.resample(layer()).unwrap(), layer());

        let native = AffineTransform::from_origin(-100.0, 40.0, 0.5, -0.5);
        assert_eq!(resampler.transform(&native).unwrap(), native);
    }

    #[test]
    fn test_layer_and_transform_share_factor() {
        let resampler = Resampler::for_strategy(RasterizationStrategy::Downscale);
        let native = AffineTransform::from_origin(-100.0, 40.0, 0.5, -0.5);

        let fine = resampler.resample(layer()).unwrap();
        let transform = resampler.transform(&native).unwrap();

        assert_eq!(fine.len(), layer().len() * 25);
        assert_eq!((fine.width(), fine.height()), (15, 10));
        assert_eq!(fine.scale(), transform.scale());
        assert_eq!(transform.pixel_width, 0.1);
        // The fine grid covers the same extent
        let (fine_bounds, native_bounds) = (transform.bounds(15, 10), native.bounds(3, 2));
        assert_approx_eq!(fine_bounds.min_x, native_bounds.min_x, 1e-9);
        assert_approx_eq!(fine_bounds.max_x, native_bounds.max_x, 1e-9);
        assert_approx_eq!(fine_bounds.min_y, native_bounds.min_y, 1e-9);
        assert_approx_eq!(fine_bounds.max_y, native_bounds.max_y, 1e-9);
    }

    #[test]
    fn test_zero_factor_rejected() {
        assert!(Resampler::with_factor(0).is_err());
    }
}
