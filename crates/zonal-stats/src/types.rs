//! Core types shared by the engine and its callers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ZonalError;

/// The kind of spatial unit values are aggregated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Geography {
    /// ZIP code areas (polygons) or ZIP centroids (points).
    Zip,
    /// Census ZIP code tabulation areas.
    Zcta,
    /// Counties, labelled by 5-digit FIPS.
    County,
    /// Any other labelled geometry collection.
    Custom,
}

impl Geography {
    /// Lower-case name, used as the label column header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Zcta => "zcta",
            Self::County => "county",
            Self::Custom => "custom",
        }
    }

    /// Attribute names tried, in order, for a feature's label.
    pub fn label_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Zip => &["ZIP", "ZCTA5CE10", "ZCTA5CE20", "GEOID10"],
            Self::Zcta => &["ZCTA5CE10", "ZCTA5CE20", "ZCTA", "ZIP"],
            Self::County => &["GEOID", "FIPS", "GEOID10"],
            Self::Custom => &["LABEL", "ID", "NAME"],
        }
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Geography {
    type Err = ZonalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "zcta" => Ok(Self::Zcta),
            "county" => Ok(Self::County),
            "custom" => Ok(Self::Custom),
            _ => Err(ZonalError::UnknownName {
                kind: "geography",
                value: s.to_string(),
            }),
        }
    }
}

/// Policy deciding which raster cells belong to a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterizationStrategy {
    /// Cells whose centre lies inside the polygon.
    #[default]
    Default,
    /// Every cell the polygon touches.
    AllTouched,
    /// Average of `Default` and `AllTouched`.
    Combined,
    /// `Default` on a grid disaggregated by a fixed factor.
    Downscale,
    /// Same as `Combined`.
    Auto,
}

impl RasterizationStrategy {
    /// Upscaling factor applied to the raster before cells are selected.
    pub const DOWNSCALE_FACTOR: u32 = 5;

    /// Upscaling factor this strategy implies for layers and transform.
    pub fn scale_factor(&self) -> u32 {
        match self {
            Self::Downscale => Self::DOWNSCALE_FACTOR,
            _ => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AllTouched => "all_touched",
            Self::Combined => "combined",
            Self::Downscale => "downscale",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for RasterizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RasterizationStrategy {
    type Err = ZonalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "default" => Ok(Self::Default),
            "all_touched" => Ok(Self::AllTouched),
            "combined" => Ok(Self::Combined),
            "downscale" => Ok(Self::Downscale),
            "auto" => Ok(Self::Auto),
            _ => Err(ZonalError::UnknownName {
                kind: "rasterization strategy",
                value: s.to_string(),
            }),
        }
    }
}

/// Summary statistic computed over a geometry's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsMode {
    #[default]
    Mean,
    Max,
}

impl FromStr for StatisticsMode {
    type Err = ZonalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" | "average" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            _ => Err(ZonalError::UnknownName {
                kind: "statistic",
                value: s.to_string(),
            }),
        }
    }
}

/// One geometry's value for a single layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalRecord {
    pub value: f64,
    pub label: String,
}

/// One geometry's values for several layers, in layer order.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiZonalRecord {
    pub values: Vec<f64>,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_scale_factor() {
        assert_eq!(RasterizationStrategy::Downscale.scale_factor(), 5);
        assert_eq!(RasterizationStrategy::Default.scale_factor(), 1);
        assert_eq!(RasterizationStrategy::AllTouched.scale_factor(), 1);
        assert_eq!(RasterizationStrategy::Auto.scale_factor(), 1);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "All-Touched".parse::<RasterizationStrategy>().unwrap(),
            RasterizationStrategy::AllTouched
        );
        assert_eq!(
            "DOWNSCALE".parse::<RasterizationStrategy>().unwrap(),
            RasterizationStrategy::Downscale
        );
        assert!("bilinear".parse::<RasterizationStrategy>().is_err());
    }

    #[test]
    fn test_geography_parse_and_label() {
        let geography: Geography = "County".parse().unwrap();
        assert_eq!(geography, Geography::County);
        assert_eq!(geography.to_string(), "county");
        assert!("state".parse::<Geography>().is_err());
    }

    #[test]
    fn test_statistics_parse() {
        assert_eq!("MAX".parse::<StatisticsMode>().unwrap(), StatisticsMode::Max);
        assert!("median".parse::<StatisticsMode>().is_err());
    }
}
