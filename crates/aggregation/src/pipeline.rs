//! Building tasks from a run configuration and executing them in order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use walkdir::WalkDir;
use zonal_stats::{Geography, ZonalStatistics};

use crate::config::{RunConfig, ShapeKind};
use crate::engine::{Aggregator, ExecutionOutcome};
use crate::error::{AggregationError, Result};
use crate::metadata::{output_file_name, parse_wustl_period, sibling_output_path};
use crate::profiling::ProfilingData;
use crate::sink::OpenMode;
use crate::task::{AggregationTask, ExtraColumn};

/// Variable aggregated from monthly PM2.5 files.
pub const WUSTL_VARIABLE: &str = "PM25";

/// Outcomes and merged profile of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub outcomes: Vec<ExecutionOutcome>,
    pub profile: ProfilingData,
}

/// An ordered collection of tasks run one after another.
///
/// Each task's output is flushed and closed before the next one starts.
/// The first failure stops the run.
pub struct Pipeline<'a> {
    engine: &'a dyn ZonalStatistics,
    tasks: Vec<AggregationTask>,
    resume: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(engine: &'a dyn ZonalStatistics) -> Self {
        Self {
            engine,
            tasks: Vec::new(),
            resume: false,
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<AggregationTask>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    /// Continue a previous run: existing outputs are appended to.
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn add_task(&mut self, task: AggregationTask) {
        self.tasks.push(task);
    }

    pub fn tasks(&self) -> &[AggregationTask] {
        &self.tasks
    }

    /// Run every task in order.
    ///
    /// The first task writing an output starts it over (header first);
    /// later tasks writing the same output append. When resuming, outputs
    /// that already exist are appended to from the start.
    pub fn execute_sequentially(&self) -> Result<PipelineReport> {
        let mut started: HashSet<PathBuf> = HashSet::new();
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        let mut profile = ProfilingData::default();

        for (index, task) in self.tasks.iter().enumerate() {
            let continuing = started.contains(&task.output) || (self.resume && task.output.exists());
            let mode = if continuing {
                OpenMode::Append
            } else {
                OpenMode::Truncate
            };
            info!(
                task = index + 1,
                of = self.tasks.len(),
                input = %task.input.display(),
                ?mode,
                "Starting task"
            );

            let mut aggregator = Aggregator::new(task.clone(), self.engine);
            let outcome = aggregator.execute(mode)?;
            profile.update(aggregator.profile());
            started.insert(task.output.clone());
            outcomes.push(outcome);
        }

        profile.log("Pipeline completed");
        Ok(PipelineReport { outcomes, profile })
    }
}

/// The task of a single-file run: `<destination>/<stem>_<geography>.csv[.gz]`.
pub fn file_task(config: &RunConfig) -> Result<AggregationTask> {
    config.validate_file()?;
    let input = required_input(config)?;
    let output = config
        .destination
        .join(output_file_name(input, config.geography, config.compress)?);

    Ok(AggregationTask {
        input: input.to_path_buf(),
        variables: config.variables.clone(),
        output,
        strategy: config.strategy,
        shape_files: config.shape_files.clone(),
        geography: config.geography,
        extra_columns: config.extra_columns.clone(),
    })
}

/// The task of a monthly PM2.5 run: `PM25` with `Year` and `Month` parsed
/// from the file name, written next to the input.
pub fn wustl_task(config: &RunConfig) -> Result<AggregationTask> {
    config.validate_wustl()?;
    let input = required_input(config)?;
    let period = parse_wustl_period(input)?;

    let mut extra_columns = period.extra_columns();
    extra_columns.extend(config.extra_columns.iter().cloned());

    Ok(AggregationTask {
        input: input.to_path_buf(),
        variables: vec![WUSTL_VARIABLE.to_string()],
        output: sibling_output_path(input, config.compress)?,
        strategy: config.strategy,
        shape_files: config.shape_files.clone(),
        geography: config.geography,
        extra_columns,
    })
}

/// One task per (year, variable), years outermost.
pub fn batch_tasks(config: &RunConfig) -> Result<Vec<AggregationTask>> {
    config.validate_batch()?;
    let template = config
        .input_template
        .as_deref()
        .ok_or_else(|| AggregationError::config("input_template is required for batch runs"))?;

    let mut tasks = Vec::with_capacity(config.years.len() * config.variables.len());
    for &year in &config.years {
        let shape_files = match &config.shapes_dir {
            Some(dir) => vec![find_shape_file(dir, year, config.geography, config.shape_kind)?],
            None => config.shape_files.clone(),
        };

        for variable in &config.variables {
            let input = PathBuf::from(
                template
                    .replace("{year}", &year.to_string())
                    .replace("{variable}", variable),
            );
            let output = config
                .destination
                .join(output_file_name(&input, config.geography, config.compress)?);

            let mut extra_columns = vec![ExtraColumn::new("Year", year.to_string())];
            extra_columns.extend(config.extra_columns.iter().cloned());

            tasks.push(AggregationTask {
                input,
                variables: vec![variable.clone()],
                output,
                strategy: config.strategy,
                shape_files: shape_files.clone(),
                geography: config.geography,
                extra_columns,
            });
        }
    }

    info!(tasks = tasks.len(), "Collected batch tasks");
    Ok(tasks)
}

/// First `.shp` (in name order) under `<dir>/<year>/<geography>/<kind>/`.
pub fn find_shape_file(
    dir: &Path,
    year: u16,
    geography: Geography,
    kind: ShapeKind,
) -> Result<PathBuf> {
    let root = dir
        .join(year.to_string())
        .join(geography.as_str())
        .join(kind.as_str());

    let mut found = None;
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, root = %root.display(), "Skipping unreadable entry");
                continue;
            }
        };
        let is_shp = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("shp"));
        if entry.file_type().is_file() && is_shp {
            found = Some(entry.into_path());
            break;
        }
    }

    found.ok_or_else(|| {
        AggregationError::config(format!("No shape file found under {}", root.display()))
    })
}

fn required_input(config: &RunConfig) -> Result<&Path> {
    config
        .raw_input_path
        .as_deref()
        .ok_or_else(|| AggregationError::config("An input file is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonal_stats::RasterizationStrategy;

    fn base_config() -> RunConfig {
        RunConfig {
            destination: PathBuf::from("/out"),
            shape_files: vec![PathBuf::from("/shapes/county.shp")],
            geography: Geography::County,
            strategy: RasterizationStrategy::Downscale,
            variables: vec!["pm25".to_string()],
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_file_task() {
        let config = RunConfig {
            raw_input_path: Some(PathBuf::from("/raw/pm25_2018.nc")),
            compress: true,
            extra_columns: vec![ExtraColumn::new("Source", "wustl")],
            ..base_config()
        };
        let task = file_task(&config).unwrap();

        assert_eq!(task.output, PathBuf::from("/out/pm25_2018_county.csv.gz"));
        assert_eq!(task.variables, vec!["pm25"]);
        assert_eq!(task.extra_headers(), vec!["Source"]);
        assert_eq!(task.strategy, RasterizationStrategy::Downscale);
    }

    #[test]
    fn test_wustl_task() {
        let config = RunConfig {
            raw_input_path: Some(PathBuf::from("/raw/V4NA03_PM25_NA_201812_201812-RH35.nc")),
            variables: Vec::new(),
            ..base_config()
        };
        let task = wustl_task(&config).unwrap();

        assert_eq!(task.variables, vec!["PM25"]);
        assert_eq!(
            task.output,
            PathBuf::from("/raw/V4NA03_PM25_NA_201812_201812-RH35.csv")
        );
        assert_eq!(task.extra_headers(), vec!["Year", "Month"]);
        assert_eq!(task.extra_values(), vec!["2018", "12"]);
    }

    #[test]
    fn test_wustl_task_rejects_bad_name() {
        let config = RunConfig {
            raw_input_path: Some(PathBuf::from("/raw/pm25.nc")),
            ..base_config()
        };
        assert!(matches!(wustl_task(&config), Err(AggregationError::Config(_))));
    }

    #[test]
    fn test_batch_tasks_year_by_variable() {
        let config = RunConfig {
            years: vec![2019, 2020],
            variables: vec!["tmmx".to_string(), "pr".to_string()],
            input_template: Some("/raw/{variable}_{year}.nc".to_string()),
            geography: Geography::Zip,
            ..base_config()
        };
        let tasks = batch_tasks(&config).unwrap();

        let inputs: Vec<_> = tasks.iter().map(|t| t.input.clone()).collect();
        assert_eq!(
            inputs,
            vec![
                PathBuf::from("/raw/tmmx_2019.nc"),
                PathBuf::from("/raw/pr_2019.nc"),
                PathBuf::from("/raw/tmmx_2020.nc"),
                PathBuf::from("/raw/pr_2020.nc"),
            ]
        );
        assert_eq!(tasks[3].output, PathBuf::from("/out/pr_2020_zip.csv"));
        assert_eq!(tasks[3].variables, vec!["pr"]);
        assert_eq!(tasks[3].extra_values(), vec!["2020"]);
    }

    #[test]
    fn test_find_shape_file() {
        let dir = tempfile::tempdir().unwrap();
        let polygons = dir.path().join("2019").join("zip").join("polygon");
        std::fs::create_dir_all(&polygons).unwrap();
        std::fs::write(polygons.join("zip.dbf"), b"").unwrap();
        std::fs::write(polygons.join("zip.shp"), b"").unwrap();

        let found = find_shape_file(dir.path(), 2019, Geography::Zip, ShapeKind::Polygon).unwrap();
        assert_eq!(found, polygons.join("zip.shp"));

        assert!(find_shape_file(dir.path(), 2019, Geography::Zip, ShapeKind::Point).is_err());
        assert!(find_shape_file(dir.path(), 2020, Geography::Zip, ShapeKind::Polygon).is_err());
    }

    #[test]
    fn test_batch_tasks_discover_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let points = dir.path().join("2019").join("county").join("point");
        std::fs::create_dir_all(&points).unwrap();
        std::fs::write(points.join("centroids.shp"), b"").unwrap();

        let config = RunConfig {
            years: vec![2019],
            input_template: Some("/raw/pm25_{year}.nc".to_string()),
            shapes_dir: Some(dir.path().to_path_buf()),
            shape_kind: ShapeKind::Point,
            shape_files: Vec::new(),
            ..base_config()
        };
        let tasks = batch_tasks(&config).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].shape_files, vec![points.join("centroids.shp")]);
    }
}
