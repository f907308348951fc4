//! Dropping rows whose key appears in another file.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::{debug, info};

use crate::error::{AggregationError, Result};
use crate::sink::{is_compressed, OpenMode, OutputSink};

/// Counts reported by [`exclude_rows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionSummary {
    pub output: PathBuf,
    /// Distinct keys in the reference file.
    pub keys: usize,
    /// Data rows read from the source file.
    pub rows_read: usize,
    /// Data rows written to the output.
    pub rows_kept: usize,
}

/// Integer keys compare numerically (`"06037"` equals `"6037"`), anything
/// else as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    fn parse(field: &str) -> Self {
        let field = field.trim();
        match field.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Text(field.to_string()),
        }
    }
}

/// Copy `source` to `__<name>` next to it, keeping the header and every row
/// whose key (1-based `source_column`) does not occur in column
/// `reference_column` of `reference`.
///
/// Either file may be gzip-compressed (`.gz`); the output is compressed
/// when the source is.
pub fn exclude_rows(
    source: &Path,
    source_column: usize,
    reference: &Path,
    reference_column: usize,
) -> Result<ExclusionSummary> {
    let source_index = column_index(source_column)?;
    let reference_index = column_index(reference_column)?;

    let mut keys = HashSet::new();
    let mut reference_rows = 0usize;
    for line in open_lines(reference)?.lines() {
        let line = line?;
        keys.insert(Key::parse(field(&line, reference_index)));
        reference_rows += 1;
        if reference_rows % 10_000_000 == 0 {
            debug!(keys = keys.len(), lines = reference_rows, "Reading reference keys");
        }
    }
    info!(
        reference = %reference.display(),
        keys = keys.len(),
        lines = reference_rows,
        "Key set created"
    );

    let output = prefixed_path(source)?;
    let mut sink = OutputSink::open(&output, OpenMode::Truncate)?;
    let mut lines = open_lines(source)?.lines();
    if let Some(header) = lines.next() {
        sink.write_line(&header?)?;
    }

    let (mut rows_read, mut rows_kept) = (0usize, 0usize);
    for line in lines {
        let line = line?;
        rows_read += 1;
        if !keys.contains(&Key::parse(field(&line, source_index))) {
            sink.write_line(&line)?;
            rows_kept += 1;
        }
        if rows_read % 100_000 == 0 {
            debug!(read = rows_read, kept = rows_kept, "Filtering rows");
        }
    }
    let output = sink.close()?;

    info!(
        output = %output.display(),
        read = rows_read,
        kept = rows_kept,
        "Exclusion completed"
    );
    Ok(ExclusionSummary {
        output,
        keys: keys.len(),
        rows_read,
        rows_kept,
    })
}

fn column_index(column: usize) -> Result<usize> {
    column
        .checked_sub(1)
        .ok_or_else(|| AggregationError::config("Column numbers start at 1"))
}

fn field(line: &str, index: usize) -> &str {
    line.split(',').nth(index).unwrap_or("")
}

fn open_lines(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if is_compressed(path) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::new(reader))
}

fn prefixed_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AggregationError::config(format!("Invalid file name: {}", path.display())))?;
    Ok(path.with_file_name(format!("__{}", name)))
}
