use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while reading a numeric source.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Numbers read from a source, in file order, plus the lines that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericSample {
    pub values: Vec<f64>,
    pub rejected_count: usize,
    pub total_lines: usize,
    /// False when the source did not exist. The sample is empty in that case.
    pub source_found: bool,
}

impl NumericSample {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Load one number per line from `path`.
///
/// A missing file is not an error: it yields an empty sample with
/// `source_found == false` and the caller decides what to do with it.
pub fn load_file(path: &Path) -> Result<NumericSample, DataError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Input file {:?} not found", path);
            return Ok(NumericSample::default());
        }
        Err(e) => {
            return Err(DataError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    read_numbers(BufReader::new(file)).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Parse every line of `reader` as an `f64`.
/// Lines that do not parse (blank, non-UTF-8, `nan`/`inf`) are counted and skipped.
pub fn parse_lines<R: BufRead>(reader: R) -> Result<NumericSample, DataError> {
    read_numbers(reader).map_err(|e| DataError::Io {
        path: "<input>".to_string(),
        source: e,
    })
}

fn read_numbers<R: BufRead>(mut reader: R) -> io::Result<NumericSample> {
    let mut sample = NumericSample {
        source_found: true,
        ..Default::default()
    };

    // Raw bytes so that a line which is not UTF-8 is rejected like any other bad line.
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        sample.total_lines += 1;
        let raw = strip_line_ending(&buf);

        match std::str::from_utf8(raw).ok().and_then(parse_token) {
            Some(v) => sample.values.push(v),
            None => {
                sample.rejected_count += 1;
                tracing::warn!(
                    "Invalid data found and ignored at line {}: {:?}",
                    sample.total_lines,
                    String::from_utf8_lossy(raw).trim()
                );
            }
        }
    }

    tracing::debug!(
        "Parsed {} lines: {} values, {} rejected",
        sample.total_lines,
        sample.values.len(),
        sample.rejected_count
    );
    Ok(sample)
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn parse_token(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
