//! The aggregation engine: one task from raster file to CSV rows.

use std::path::{Path, PathBuf};
use std::time::Instant;

use grid_processor::{AffineTransform, Layer};
use tracing::{debug, info};
use zonal_stats::ZonalStatistics;

use crate::error::{AggregationError, Result};
use crate::metadata::detect_source_kind;
use crate::profiling::ProfilingData;
use crate::resample::Resampler;
use crate::resolver::resolve_variables;
use crate::sink::{OpenMode, OutputSink};
use crate::source::{open_source, LayerSource};
use crate::task::AggregationTask;

/// Lifecycle of an [`Aggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    /// Source open, variables resolved, transform derived.
    Prepared,
    Computing,
    Done,
    /// An operation failed; the aggregator cannot be reused.
    Failed,
}

/// What [`Aggregator::execute`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Header plus one row per geometry.
    Completed { output: PathBuf, rows: usize },
    /// The input file does not exist; only the header was written.
    HeaderOnly { output: PathBuf },
    /// The input file does not exist and the output was being appended to;
    /// the output was left as it was.
    Skipped { output: PathBuf },
}

impl ExecutionOutcome {
    pub fn output(&self) -> &Path {
        match self {
            Self::Completed { output, .. }
            | Self::HeaderOnly { output }
            | Self::Skipped { output } => output,
        }
    }

    /// Data rows written, header excluded.
    pub fn rows(&self) -> usize {
        match self {
            Self::Completed { rows, .. } => *rows,
            Self::HeaderOnly { .. } | Self::Skipped { .. } => 0,
        }
    }
}

/// Runs one [`AggregationTask`] against a zonal-statistics engine.
///
/// The raster source is owned by the aggregator from `prepare` until the
/// task finishes or fails, and is dropped at that point.
pub struct Aggregator<'a> {
    task: AggregationTask,
    engine: &'a dyn ZonalStatistics,
    resampler: Resampler,
    state: EngineState,
    source: Option<Box<dyn LayerSource>>,
    transform: Option<AffineTransform>,
    /// Requested names as spelled in the source, once prepared.
    variables: Option<Vec<String>>,
    profile: ProfilingData,
}

impl<'a> Aggregator<'a> {
    pub fn new(task: AggregationTask, engine: &'a dyn ZonalStatistics) -> Self {
        let resampler = Resampler::for_strategy(task.strategy);
        Self {
            task,
            engine,
            resampler,
            state: EngineState::Uninitialized,
            source: None,
            transform: None,
            variables: None,
            profile: ProfilingData::default(),
        }
    }

    pub fn task(&self) -> &AggregationTask {
        &self.task
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn factor(&self) -> u32 {
        self.resampler.factor()
    }

    /// Transform at the task's resolution, once prepared.
    pub fn transform(&self) -> Option<&AffineTransform> {
        self.transform.as_ref()
    }

    /// Resolved variable names, once prepared.
    pub fn variables(&self) -> Option<&[String]> {
        self.variables.as_deref()
    }

    pub fn profile(&self) -> &ProfilingData {
        &self.profile
    }

    /// Open the source, resolve the variables and derive the transform.
    pub fn prepare(&mut self) -> Result<()> {
        if self.state != EngineState::Uninitialized {
            return Err(self.invalid_state("prepare"));
        }
        let result = self.open_and_resolve();
        if result.is_err() {
            self.fail();
        }
        result
    }

    /// Write the header row, replacing whatever the output file held.
    ///
    /// Value columns use the resolved names once prepared, the requested
    /// names before that.
    pub fn write_header(&self) -> Result<PathBuf> {
        let mut sink = OutputSink::open(&self.task.output, OpenMode::Truncate)?;
        sink.write_row(self.header())?;
        sink.close()
    }

    /// Header columns: variables, geography label, extra columns.
    pub fn header(&self) -> Vec<String> {
        let variables = self.variables.as_deref().unwrap_or(&self.task.variables);
        variables
            .iter()
            .cloned()
            .chain(std::iter::once(self.task.geography.as_str().to_string()))
            .chain(self.task.extra_headers().into_iter().map(str::to_string))
            .collect()
    }

    /// Run the task to completion.
    ///
    /// With [`OpenMode::Truncate`] the header is written first; with
    /// [`OpenMode::Append`] rows go after the file's current content. A
    /// missing input file is not an error: only the header is written when
    /// truncating, and nothing at all when appending.
    pub fn execute(&mut self, mode: OpenMode) -> Result<ExecutionOutcome> {
        if !matches!(self.state, EngineState::Uninitialized | EngineState::Prepared) {
            return Err(self.invalid_state("execute"));
        }

        let result = self.run(mode);
        match &result {
            Ok(_) => self.state = EngineState::Done,
            Err(_) => self.fail(),
        }
        self.source = None;
        result
    }

    fn run(&mut self, mode: OpenMode) -> Result<ExecutionOutcome> {
        let started = Instant::now();
        self.validate()?;

        if !self.task.input.is_file() {
            if mode == OpenMode::Append {
                info!(
                    input = %self.task.input.display(),
                    output = %self.task.output.display(),
                    "Input file was not found, leaving output unchanged"
                );
                return Ok(ExecutionOutcome::Skipped {
                    output: self.task.output.clone(),
                });
            }
            info!(
                input = %self.task.input.display(),
                output = %self.task.output.display(),
                "Input file was not found, writing header only"
            );
            let output = self.write_header()?;
            return Ok(ExecutionOutcome::HeaderOnly { output });
        }

        if self.state == EngineState::Uninitialized {
            self.open_and_resolve()?;
        }
        if mode == OpenMode::Truncate {
            self.write_header()?;
        }
        self.state = EngineState::Computing;

        let mut sink = OutputSink::open(&self.task.output, OpenMode::Append)?;
        let extraction_started = Instant::now();
        let layers = self.extract_layers()?;
        let extraction_time = extraction_started.elapsed();

        let compute_started = Instant::now();
        let rows = self.compute(&layers, &mut sink)?;
        sink.flush()?;
        let output = sink.close()?;
        let compute_time = compute_started.elapsed();

        self.profile.update(&ProfilingData {
            tasks: 1,
            factor: self.resampler.factor(),
            shape: layers
                .first()
                .map(|l| (l.width(), l.height()))
                .unwrap_or_default(),
            extraction_time,
            compute_time,
            total_time: started.elapsed(),
        });
        info!(
            input = %self.task.input.display(),
            output = %output.display(),
            rows,
            extraction_ms = extraction_time.as_millis() as u64,
            compute_ms = compute_time.as_millis() as u64,
            total_ms = started.elapsed().as_millis() as u64,
            "Aggregation completed"
        );

        Ok(ExecutionOutcome::Completed { output, rows })
    }

    /// Preconditions checked before any raster I/O.
    fn validate(&self) -> Result<()> {
        if self.task.shape_files.len() != 1 {
            return Err(AggregationError::config(format!(
                "Shape type is required and only one shape type is allowed for aggregation, got {} shape files",
                self.task.shape_files.len()
            )));
        }
        if self.task.variables.is_empty() {
            return Err(AggregationError::config("At least one variable is required"));
        }
        detect_source_kind(&self.task.input)?;
        Ok(())
    }

    fn open_and_resolve(&mut self) -> Result<()> {
        self.validate()?;
        info!(
            input = %self.task.input.display(),
            output = %self.task.output.display(),
            "Preparing aggregation"
        );

        let source = open_source(&self.task.input)?;
        let transform = self.resampler.transform(&source.transform()?)?;
        let variables = resolve_variables(
            &self.task.variables,
            &source.available_names(),
            source.path(),
        )?;
        debug!(variables = ?variables, factor = self.resampler.factor(), "Prepared");

        self.source = Some(source);
        self.transform = Some(transform);
        self.variables = Some(variables);
        self.state = EngineState::Prepared;
        Ok(())
    }

    fn extract_layers(&self) -> Result<Vec<Layer>> {
        let (Some(source), Some(variables)) = (&self.source, &self.variables) else {
            return Err(self.invalid_state("extract layers"));
        };
        variables
            .iter()
            .map(|name| self.resampler.resample(source.extract(name)?))
            .collect()
    }

    /// Hand the layers to the engine and write one row per record.
    fn compute(&self, layers: &[Layer], sink: &mut OutputSink) -> Result<usize> {
        let Some(transform) = &self.transform else {
            return Err(self.invalid_state("compute"));
        };
        let task = &self.task;
        let shapefile = &task.shape_files[0];
        let extra = task.extra_values();
        info!(
            geography = %task.geography,
            variables = ?self.variables,
            input = %task.input.display(),
            "Computing zonal statistics"
        );

        let mut rows = 0;
        if let [layer] = layers {
            let records =
                self.engine
                    .process(task.strategy, shapefile, transform, layer, task.geography)?;
            for record in records {
                let row = [record.value.to_string(), record.label];
                sink.write_row(row.iter().map(String::as_str).chain(extra.iter().copied()))?;
                rows += 1;
            }
        } else {
            let records = self.engine.process_layers(
                task.strategy,
                shapefile,
                transform,
                layers,
                task.geography,
            )?;
            for record in records {
                let values: Vec<String> = record.values.iter().map(f64::to_string).collect();
                sink.write_row(
                    values
                        .iter()
                        .map(String::as_str)
                        .chain(std::iter::once(record.label.as_str()))
                        .chain(extra.iter().copied()),
                )?;
                rows += 1;
            }
        }
        Ok(rows)
    }

    fn fail(&mut self) {
        self.state = EngineState::Failed;
        self.source = None;
    }

    fn invalid_state(&self, operation: &'static str) -> AggregationError {
        AggregationError::InvalidState {
            operation,
            state: self.state,
        }
    }
}
