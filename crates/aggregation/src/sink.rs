//! Buffered CSV output, plain or gzip-compressed.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::Result;

/// How an output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Start from an empty file.
    #[default]
    Truncate,
    /// Keep existing content and write after it.
    Append,
}

enum Target {
    Plain(BufWriter<File>),
    /// Each opening writes one gzip member; appended members concatenate
    /// into a valid multi-member stream.
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Target {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Plain(w) => w,
            Self::Gzip(w) => w,
        }
    }
}

/// Streams delimited rows to a file.
///
/// Compression follows the file name: a `.gz` suffix selects gzip.
pub struct OutputSink {
    path: PathBuf,
    target: Target,
    rows: usize,
}

impl OutputSink {
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = match mode {
            OpenMode::Truncate => File::create(path)?,
            OpenMode::Append => OpenOptions::new().create(true).append(true).open(path)?,
        };
        let writer = BufWriter::new(file);
        let target = if is_compressed(path) {
            Target::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            Target::Plain(writer)
        };

        debug!(path = %path.display(), ?mode, "Opened output");
        Ok(Self {
            path: path.to_path_buf(),
            target,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written through this sink (header included).
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn write_row<I, S>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::new();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            push_field(&mut line, field.as_ref());
        }
        line.push('\n');

        self.target.writer().write_all(line.as_bytes())?;
        self.rows += 1;
        Ok(())
    }

    /// Write an already formatted line; a newline is appended.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let writer = self.target.writer();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        self.rows += 1;
        Ok(())
    }

    /// Push buffered rows to the file.
    pub fn flush(&mut self) -> Result<()> {
        self.target.writer().flush()?;
        Ok(())
    }

    /// Flush, finish the gzip stream and close the file.
    pub fn close(self) -> Result<PathBuf> {
        match self.target {
            Target::Plain(mut w) => w.flush()?,
            Target::Gzip(encoder) => encoder.finish()?.flush()?,
        }
        debug!(path = %self.path.display(), rows = self.rows, "Closed output");
        Ok(self.path)
    }
}

/// Whether the path selects gzip output.
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Append a field, quoting it when it holds a delimiter, quote or newline.
fn push_field(line: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        line.push('"');
        line.push_str(&field.replace('"', "\"\""));
        line.push('"');
    } else {
        line.push_str(field);
    }
}
