//! File naming conventions for raster inputs and CSV outputs.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AggregationError, Result};
use crate::task::ExtraColumn;
use zonal_stats::Geography;

/// Raster layouts the pipeline can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Named variables (NetCDF)
    Gridded,
    /// Described bands (GeoTIFF)
    BandStack,
}

/// Detect the source kind from the file extension.
pub fn detect_source_kind(path: &Path) -> Result<SourceKind> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("nc") | Some("nc4") => Ok(SourceKind::Gridded),
        Some("tif") | Some("tiff") => Ok(SourceKind::BandStack),
        _ => Err(AggregationError::config(format!(
            "NetCDF (.nc) or GeoTIFF (.tif) file is expected, got {}",
            path.display()
        ))),
    }
}

fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AggregationError::config(format!("Invalid input path: {}", path.display())))
}

/// `<stem>_<geography>.csv`, with `.gz` when compressed.
pub fn output_file_name(input: &Path, geography: Geography, compress: bool) -> Result<String> {
    let mut name = format!("{}_{}.csv", file_stem(input)?, geography.as_str());
    if compress {
        name.push_str(".gz");
    }
    Ok(name)
}

/// Output next to the input: `<dir>/<stem>.csv[.gz]`.
pub fn sibling_output_path(input: &Path, compress: bool) -> Result<PathBuf> {
    let mut name = format!("{}.csv", file_stem(input)?);
    if compress {
        name.push_str(".gz");
    }
    Ok(input.with_file_name(name))
}

/// Year and month of a monthly PM2.5 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WustlPeriod {
    pub year: u16,
    pub month: u8,
}

impl WustlPeriod {
    /// `Year` and `Month` columns for every output row.
    pub fn extra_columns(&self) -> Vec<ExtraColumn> {
        vec![
            ExtraColumn::new("Year", self.year.to_string()),
            ExtraColumn::new("Month", format!("{:02}", self.month)),
        ]
    }
}

fn period_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([12][0-9]{3})([01][0-9])_([12][0-9]{3})([01][0-9])").ok())
        .as_ref()
}

/// Parse `YYYYMM_YYYYMM` (the same month twice) out of a file name.
///
/// ```
/// use aggregation::parse_wustl_period;
/// use std::path::Path;
///
/// let period = parse_wustl_period(Path::new("V5GL02.HybridPM25.NorthAmerica.201812_201812.nc")).unwrap();
/// assert_eq!((period.year, period.month), (2018, 12));
/// ```
pub fn parse_wustl_period(path: &Path) -> Result<WustlPeriod> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    period_pattern()
        .and_then(|pattern| {
            // Every start offset, so overlapping pairs are all tried
            (0..name.len())
                .filter(|&start| name.is_char_boundary(start))
                .filter_map(|start| pattern.captures_at(name, start))
                .filter(|c| c[1] == c[3] && c[2] == c[4])
                .find_map(|c| {
                    let year = c[1].parse().ok()?;
                    let month = c[2].parse().ok()?;
                    (1..=12).contains(&month).then_some(WustlPeriod { year, month })
                })
        })
        .ok_or_else(|| {
            AggregationError::config(format!(
                "File name: {} does not match expected pattern",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_source_kind() {
        assert_eq!(
            detect_source_kind(Path::new("/data/pm25.nc")).unwrap(),
            SourceKind::Gridded
        );
        assert_eq!(
            detect_source_kind(Path::new("tmmx_2020.NC4")).unwrap(),
            SourceKind::Gridded
        );
        assert_eq!(
            detect_source_kind(Path::new("no2_o3.tif")).unwrap(),
            SourceKind::BandStack
        );
        assert_eq!(
            detect_source_kind(Path::new("no2_o3.TIFF")).unwrap(),
            SourceKind::BandStack
        );
    }

    #[test]
    fn test_detect_source_kind_rejects_others() {
        for name in ["data.csv", "data.grib2", "data"] {
            let err = detect_source_kind(Path::new(name)).unwrap_err();
            assert!(matches!(err, AggregationError::Config(_)), "{}", name);
        }
    }

    #[test]
    fn test_output_file_name() {
        let input = Path::new("/raw/tmmx_2019.nc");
        assert_eq!(
            output_file_name(input, Geography::Zip, false).unwrap(),
            "tmmx_2019_zip.csv"
        );
        assert_eq!(
            output_file_name(input, Geography::County, true).unwrap(),
            "tmmx_2019_county.csv.gz"
        );
    }

    #[test]
    fn test_sibling_output_path() {
        let input = Path::new("/raw/pm25_201812_201812.nc");
        assert_eq!(
            sibling_output_path(input, true).unwrap(),
            PathBuf::from("/raw/pm25_201812_201812.csv.gz")
        );
    }

    #[test]
    fn test_parse_wustl_period() {
        let period =
            parse_wustl_period(Path::new("/raw/V4NA03_PM25_NA_200101_200101-RH35.nc")).unwrap();
        assert_eq!(period, WustlPeriod { year: 2001, month: 1 });

        let columns = period.extra_columns();
        assert_eq!(columns[0], ExtraColumn::new("Year", "2001"));
        assert_eq!(columns[1], ExtraColumn::new("Month", "01"));
    }

    #[test]
    fn test_parse_wustl_period_requires_same_month() {
        assert!(parse_wustl_period(Path::new("pm25_200101_200112.nc")).is_err());
        assert!(parse_wustl_period(Path::new("pm25_2001.nc")).is_err());
        assert!(parse_wustl_period(Path::new("pm25_200113_200113.nc")).is_err());
    }

    #[test]
    fn test_parse_wustl_period_overlapping_pairs() {
        let period = parse_wustl_period(Path::new("x_201811_201812_201812.nc")).unwrap();
        assert_eq!(period, WustlPeriod { year: 2018, month: 12 });
    }
}
