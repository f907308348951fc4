//! Loading run configuration from YAML and the command line.
//!
//! YAML files support environment variable substitution with `${VAR}` and
//! `${VAR:-default}`; paths may start with `~`.

use std::fs;
use std::path::{Path, PathBuf};

use aggregation::{ExtraColumn, RunConfig};
use anyhow::{bail, Context, Result};
use zonal_stats::{Geography, RasterizationStrategy, StatisticsMode};

/// Load a run configuration file.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run config from {:?}", path))?;

    let expanded = expand_env_vars(&content)?;

    let mut config: RunConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse run config from {:?}", path))?;
    expand_paths(&mut config);

    Ok(config)
}

/// Values given on the command line; each one present replaces the file's.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub shape_files: Vec<PathBuf>,
    pub variables: Vec<String>,
    pub geography: Option<Geography>,
    pub strategy: Option<RasterizationStrategy>,
    pub statistics: Option<StatisticsMode>,
    pub extra_columns: Vec<ExtraColumn>,
    pub label_field: Option<String>,
    pub compress: bool,
    pub resume: bool,
    pub years: Vec<u16>,
    pub input_template: Option<String>,
    pub shapes_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, config: &mut RunConfig) {
        if let Some(input) = self.input {
            config.raw_input_path = Some(input);
        }
        if let Some(destination) = self.destination {
            config.destination = destination;
        }
        if !self.shape_files.is_empty() {
            config.shape_files = self.shape_files;
        }
        if !self.variables.is_empty() {
            config.variables = self.variables;
        }
        if let Some(geography) = self.geography {
            config.geography = geography;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(statistics) = self.statistics {
            config.statistics = statistics;
        }
        if !self.extra_columns.is_empty() {
            config.extra_columns = self.extra_columns;
        }
        if let Some(label_field) = self.label_field {
            config.label_field = Some(label_field);
        }
        if !self.years.is_empty() {
            config.years = self.years;
        }
        if let Some(template) = self.input_template {
            config.input_template = Some(template);
        }
        if let Some(shapes_dir) = self.shapes_dir {
            config.shapes_dir = Some(shapes_dir);
        }
        config.compress |= self.compress;
        config.resume |= self.resume;
        expand_paths(config);
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

fn expand_paths(config: &mut RunConfig) {
    config.raw_input_path = config.raw_input_path.as_deref().map(expand_path);
    config.destination = expand_path(&config.destination);
    config.shape_files = config.shape_files.iter().map(|p| expand_path(p)).collect();
    config.shapes_dir = config.shapes_dir.as_deref().map(expand_path);
    config.input_template = config
        .input_template
        .as_deref()
        .map(|t| shellexpand::tilde(t).into_owned());
}

/// Substitute `${VAR}` and `${VAR:-default}` in YAML content.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let mut depth = 1;
        let mut end = None;
        for (i, c) in after.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            bail!("Unclosed variable substitution: ${{{}", after);
        };

        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}
