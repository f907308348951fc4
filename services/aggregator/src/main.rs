//! Zonal aggregation of gridded rasters over shape files.
//!
//! Reads NetCDF grids or GeoTIFF band stacks, aggregates the requested
//! variables per polygon (or point) and writes one CSV row per shape.

mod config;

use std::path::PathBuf;

use aggregation::{
    batch_tasks, exclude_rows, file_task, wustl_task, AggregationTask, ExtraColumn, Pipeline,
    RunConfig,
};
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zonal_stats::{Geography, RasterizationStrategy, ShapefileEngine, StatisticsMode};

use config::{load_run_config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "aggregator")]
#[command(about = "Aggregate raster variables over shape files into CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate a single NetCDF or GeoTIFF file
    File {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Aggregate a monthly PM2.5 file named like `..._YYYYMM_YYYYMM.nc`
    Wustl {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Aggregate every variable for every year of a batch
    Batch {
        #[command(flatten)]
        run: RunArgs,

        /// Years to process
        #[arg(short, long = "year", value_delimiter = ',')]
        years: Vec<u16>,

        /// Input path containing `{year}` and `{variable}`
        #[arg(long)]
        input_template: Option<String>,

        /// Directory laid out as `<year>/<geography>/<polygon|point>/`
        #[arg(long)]
        shapes_dir: Option<PathBuf>,
    },

    /// Drop rows of a CSV whose key occurs in another CSV
    Exclude {
        /// CSV to filter
        source: PathBuf,

        /// 1-based key column of the source
        source_column: usize,

        /// CSV holding the keys to drop
        reference: PathBuf,

        /// 1-based key column of the reference
        reference_column: usize,
    },
}

/// Options shared by the aggregation subcommands.
#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// YAML run configuration; command line options take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raster file to aggregate
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving output files
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Shape file to aggregate over
    #[arg(short, long = "shape-file")]
    shape_files: Vec<PathBuf>,

    /// Variables to aggregate
    #[arg(short, long = "variable", value_delimiter = ',')]
    variables: Vec<String>,

    /// Geography type of the shape file (zip, zcta, county, custom)
    #[arg(short, long)]
    geography: Option<Geography>,

    /// Rasterization strategy (default, all_touched, combined, downscale, auto)
    #[arg(long)]
    strategy: Option<RasterizationStrategy>,

    /// Statistic computed per shape (mean, max)
    #[arg(long)]
    statistics: Option<StatisticsMode>,

    /// Constant column appended to every row, as NAME=VALUE
    #[arg(short, long = "extra")]
    extra_columns: Vec<ExtraColumn>,

    /// Shape file attribute holding row labels
    #[arg(long)]
    label_field: Option<String>,

    /// Write gzip-compressed output
    #[arg(long)]
    compress: bool,

    /// Append to outputs left by a previous run
    #[arg(long)]
    resume: bool,
}

impl RunArgs {
    fn into_config(self, overrides: Overrides) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => load_run_config(path)?,
            None => RunConfig::default(),
        };
        Overrides {
            input: self.input,
            destination: self.destination,
            shape_files: self.shape_files,
            variables: self.variables,
            geography: self.geography,
            strategy: self.strategy,
            statistics: self.statistics,
            extra_columns: self.extra_columns,
            label_field: self.label_field,
            compress: self.compress,
            resume: self.resume,
            ..overrides
        }
        .apply(&mut config);
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }

    match cli.command {
        Commands::File { run } => {
            let config = run.into_config(Overrides::default())?;
            let task = file_task(&config)?;
            run_pipeline(&config, vec![task])
        }
        Commands::Wustl { run } => {
            let config = run.into_config(Overrides::default())?;
            let task = wustl_task(&config)?;
            run_pipeline(&config, vec![task])
        }
        Commands::Batch {
            run,
            years,
            input_template,
            shapes_dir,
        } => {
            let config = run.into_config(Overrides {
                years,
                input_template,
                shapes_dir,
                ..Overrides::default()
            })?;
            let tasks = batch_tasks(&config)?;
            run_pipeline(&config, tasks)
        }
        Commands::Exclude {
            source,
            source_column,
            reference,
            reference_column,
        } => {
            let summary = exclude_rows(&source, source_column, &reference, reference_column)?;
            info!(
                output = %summary.output.display(),
                keys = summary.keys,
                read = summary.rows_read,
                kept = summary.rows_kept,
                "Exclusion finished"
            );
            println!("{}", summary.output.display());
            Ok(())
        }
    }
}

fn run_pipeline(config: &RunConfig, tasks: Vec<AggregationTask>) -> Result<()> {
    let mut engine = ShapefileEngine::new(config.statistics);
    if let Some(field) = &config.label_field {
        engine = engine.with_label_field(field.clone());
    }

    info!(
        tasks = tasks.len(),
        geography = %config.geography,
        strategy = %config.strategy,
        "Starting aggregation"
    );

    let report = Pipeline::new(&engine)
        .with_tasks(tasks)
        .resume(config.resume)
        .execute_sequentially()?;

    for outcome in &report.outcomes {
        println!("{}\t{}", outcome.output().display(), outcome.rows());
    }
    Ok(())
}
