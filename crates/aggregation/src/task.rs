//! One unit of aggregation work.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AggregationError;
use zonal_stats::{Geography, RasterizationStrategy};

/// A constant column appended to every output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraColumn {
    pub name: String,
    pub value: String,
}

impl ExtraColumn {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ExtraColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Parses `Name=Value`.
impl FromStr for ExtraColumn {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok(Self::new(name.trim(), value.trim()))
            }
            _ => Err(AggregationError::config(format!(
                "Extra column must be NAME=VALUE, got '{}'",
                s
            ))),
        }
    }
}

/// Input raster, requested variables, output file and the geometries to
/// aggregate over.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationTask {
    pub input: PathBuf,
    /// Requested variable names, in output column order.
    pub variables: Vec<String>,
    pub output: PathBuf,
    pub strategy: RasterizationStrategy,
    /// Exactly one is required; the list form lets preparation report
    /// the violation.
    pub shape_files: Vec<PathBuf>,
    pub geography: Geography,
    pub extra_columns: Vec<ExtraColumn>,
}

impl AggregationTask {
    pub fn new(
        input: impl Into<PathBuf>,
        variables: Vec<String>,
        output: impl Into<PathBuf>,
        shape_file: impl Into<PathBuf>,
        geography: Geography,
    ) -> Self {
        Self {
            input: input.into(),
            variables,
            output: output.into(),
            strategy: RasterizationStrategy::default(),
            shape_files: vec![shape_file.into()],
            geography,
            extra_columns: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: RasterizationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_extra_column(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_columns.push(ExtraColumn::new(name, value));
        self
    }

    /// Names of the extra columns, in configured order.
    pub fn extra_headers(&self) -> Vec<&str> {
        self.extra_columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of the extra columns, in configured order.
    pub fn extra_values(&self) -> Vec<&str> {
        self.extra_columns.iter().map(|c| c.value.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_column_parse() {
        let column: ExtraColumn = "Year=2018".parse().unwrap();
        assert_eq!(column, ExtraColumn::new("Year", "2018"));
        assert_eq!(column.to_string(), "Year=2018");

        let column: ExtraColumn = " Note = a=b ".parse().unwrap();
        assert_eq!(column, ExtraColumn::new("Note", "a=b"));
    }

    #[test]
    fn test_extra_column_parse_invalid() {
        assert!("Year".parse::<ExtraColumn>().is_err());
        assert!("=2018".parse::<ExtraColumn>().is_err());
    }

    #[test]
    fn test_task_builder() {
        let task = AggregationTask::new(
            "/raw/pm25.nc",
            vec!["PM25".to_string()],
            "/out/pm25_county.csv",
            "/shapes/county.shp",
            Geography::County,
        )
        .with_strategy(RasterizationStrategy::Downscale)
        .with_extra_column("Year", "2018")
        .with_extra_column("Month", "12");

        assert_eq!(task.shape_files.len(), 1);
        assert_eq!(task.extra_headers(), vec!["Year", "Month"]);
        assert_eq!(task.extra_values(), vec!["2018", "12"]);
        assert_eq!(task.strategy, RasterizationStrategy::Downscale);
    }
}
