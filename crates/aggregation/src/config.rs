//! Run configuration shared by every invocation mode.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AggregationError, Result};
use crate::metadata::detect_source_kind;
use crate::task::ExtraColumn;
use zonal_stats::{Geography, RasterizationStrategy, StatisticsMode};

/// Geometry flavour of a shape file directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Polygon,
    Point,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polygon => "polygon",
            Self::Point => "point",
        }
    }
}

/// Everything needed to build aggregation tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Raster file for single-file runs.
    pub raw_input_path: Option<PathBuf>,
    /// Directory receiving output files.
    pub destination: PathBuf,
    /// Write `.csv.gz` instead of `.csv`.
    pub compress: bool,
    pub shape_files: Vec<PathBuf>,
    pub geography: Geography,
    pub strategy: RasterizationStrategy,
    pub variables: Vec<String>,
    pub extra_columns: Vec<ExtraColumn>,
    pub statistics: StatisticsMode,
    /// Shapefile attribute holding labels; geography defaults otherwise.
    pub label_field: Option<String>,
    /// Append to existing outputs instead of starting them over.
    pub resume: bool,

    /// Years of a batch run.
    pub years: Vec<u16>,
    /// Input path with `{year}` and `{variable}` placeholders.
    pub input_template: Option<String>,
    /// Root of `<year>/<geography>/<polygon|point>/` shape file directories.
    pub shapes_dir: Option<PathBuf>,
    pub shape_kind: ShapeKind,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            raw_input_path: None,
            destination: PathBuf::from("."),
            compress: false,
            shape_files: Vec::new(),
            geography: Geography::Zip,
            strategy: RasterizationStrategy::default(),
            variables: Vec::new(),
            extra_columns: Vec::new(),
            statistics: StatisticsMode::default(),
            label_field: None,
            resume: false,
            years: Vec::new(),
            input_template: None,
            shapes_dir: None,
            shape_kind: ShapeKind::default(),
        }
    }
}

impl RunConfig {
    /// Checks for a single-file run.
    pub fn validate_file(&self) -> Result<()> {
        let input = self
            .raw_input_path
            .as_ref()
            .ok_or_else(|| AggregationError::config("An input file is required"))?;
        detect_source_kind(input)?;
        self.validate_shape_files()?;
        self.validate_variables()?;
        self.validate_extra_columns(&[])
    }

    /// Checks for a monthly PM2.5 run; `Year` and `Month` are derived from
    /// the file name.
    pub fn validate_wustl(&self) -> Result<()> {
        let input = self
            .raw_input_path
            .as_ref()
            .ok_or_else(|| AggregationError::config("An input file is required"))?;
        detect_source_kind(input)?;
        self.validate_shape_files()?;
        self.validate_extra_columns(&["Year", "Month"])
    }

    /// Checks for a year x variable batch run.
    pub fn validate_batch(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(AggregationError::config("At least one year is required"));
        }
        let template = self
            .input_template
            .as_deref()
            .ok_or_else(|| AggregationError::config("input_template is required for batch runs"))?;
        if !template.contains("{year}") {
            return Err(AggregationError::config(format!(
                "input_template must contain {{year}}: {}",
                template
            )));
        }
        if self.variables.len() > 1 && !template.contains("{variable}") {
            return Err(AggregationError::config(format!(
                "input_template must contain {{variable}} when several variables are requested: {}",
                template
            )));
        }
        detect_source_kind(Path::new(template))?;
        if self.shapes_dir.is_none() {
            self.validate_shape_files()?;
        }
        self.validate_variables()?;
        self.validate_extra_columns(&["Year"])
    }

    fn validate_shape_files(&self) -> Result<()> {
        if self.shape_files.len() != 1 {
            return Err(AggregationError::config(format!(
                "Shape type is required and only one shape type is allowed for aggregation, got {} shape files",
                self.shape_files.len()
            )));
        }
        Ok(())
    }

    fn validate_variables(&self) -> Result<()> {
        if self.variables.is_empty() {
            return Err(AggregationError::config("At least one variable is required"));
        }
        Ok(())
    }

    /// Extra column names must be unique and must not shadow `reserved`.
    fn validate_extra_columns(&self, reserved: &[&str]) -> Result<()> {
        let mut seen = HashSet::new();
        for column in &self.extra_columns {
            if reserved.iter().any(|r| r.eq_ignore_ascii_case(&column.name)) {
                return Err(AggregationError::config(format!(
                    "Extra column {} conflicts with a derived column",
                    column.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(AggregationError::config(format!(
                    "Duplicate extra column {}",
                    column.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config() -> RunConfig {
        RunConfig {
            raw_input_path: Some(PathBuf::from("/raw/pm25.nc")),
            shape_files: vec![PathBuf::from("/shapes/county.shp")],
            variables: vec!["PM25".to_string()],
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.destination, PathBuf::from("."));
        assert_eq!(config.geography, Geography::Zip);
        assert_eq!(config.strategy, RasterizationStrategy::Default);
        assert_eq!(config.statistics, StatisticsMode::Mean);
        assert!(!config.compress);
    }

    #[test]
    fn test_validate_file() {
        assert!(file_config().validate_file().is_ok());

        let mut config = file_config();
        config.raw_input_path = Some(PathBuf::from("/raw/pm25.csv"));
        assert!(matches!(config.validate_file(), Err(AggregationError::Config(_))));

        let mut config = file_config();
        config.shape_files.push(PathBuf::from("/shapes/zip.shp"));
        assert!(config.validate_file().is_err());

        let mut config = file_config();
        config.shape_files.clear();
        assert!(config.validate_file().is_err());

        let mut config = file_config();
        config.variables.clear();
        assert!(config.validate_file().is_err());
    }

    #[test]
    fn test_duplicate_extra_columns() {
        let mut config = file_config();
        config.extra_columns = vec![ExtraColumn::new("Year", "2018"), ExtraColumn::new("Year", "2019")];
        assert!(config.validate_file().is_err());
    }

    #[test]
    fn test_wustl_reserves_year_and_month() {
        let mut config = file_config();
        config.variables.clear();
        assert!(config.validate_wustl().is_ok());

        config.extra_columns = vec![ExtraColumn::new("month", "01")];
        assert!(config.validate_wustl().is_err());
    }

    #[test]
    fn test_validate_batch() {
        let config = RunConfig {
            years: vec![2019, 2020],
            input_template: Some("/raw/{variable}_{year}.nc".to_string()),
            shapes_dir: Some(PathBuf::from("/shapes")),
            variables: vec!["tmmx".to_string(), "pr".to_string()],
            ..RunConfig::default()
        };
        assert!(config.validate_batch().is_ok());

        let mut conflicting = config.clone();
        conflicting.extra_columns = vec![ExtraColumn::new("Year", "2018")];
        assert!(conflicting.validate_batch().is_err());

        let mut no_variable = config.clone();
        no_variable.input_template = Some("/raw/data_{year}.nc".to_string());
        assert!(no_variable.validate_batch().is_err());

        let mut wrong_kind = config.clone();
        wrong_kind.input_template = Some("/raw/{variable}_{year}.csv".to_string());
        assert!(matches!(
            wrong_kind.validate_batch(),
            Err(AggregationError::Config(_))
        ));

        let mut no_years = config;
        no_years.years.clear();
        assert!(no_years.validate_batch().is_err());
    }

    #[test]
    fn test_deserialize_yaml_fields() {
        let config: RunConfig = serde_yaml::from_str(
            "geography: county\nstrategy: downscale\nstatistics: max\nshape_kind: point\n",
        )
        .unwrap();
        assert_eq!(config.geography, Geography::County);
        assert_eq!(config.strategy, RasterizationStrategy::Downscale);
        assert_eq!(config.statistics, StatisticsMode::Max);
        assert_eq!(config.shape_kind, ShapeKind::Point);
    }
}
