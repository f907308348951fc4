//! Scratch directories and output readers.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tempfile::TempDir;

/// Creates a fresh scratch directory, removed when the guard is dropped.
pub fn scratch_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create scratch directory")
}

/// Reads every line of a text output file, transparently un-gzipping
/// files whose name ends in `.gz`.
pub fn read_output_lines<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    let file = File::open(path)
        .unwrap_or_else(|e| panic!("Failed to open {}: {}", path.display(), e));

    let reader: Box<dyn Read> = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    BufReader::new(reader)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Splits output lines into comma-separated fields.
pub fn read_output_rows<P: AsRef<Path>>(path: P) -> Vec<Vec<String>> {
    read_output_lines(path)
        .iter()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_read_plain_and_gzip() {
        let dir = scratch_dir();

        let plain = dir.path().join("out.csv");
        std::fs::write(&plain, "a,b\n1,2\n").unwrap();
        assert_eq!(read_output_lines(&plain), vec!["a,b", "1,2"]);

        let gz = dir.path().join("out.csv.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"a,b\n3,4\n").unwrap();
        encoder.finish().unwrap();
        assert_eq!(read_output_rows(&gz)[1], vec!["3", "4"]);
    }
}
