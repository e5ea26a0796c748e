use std::fs::OpenOptions;
use std::io;
use std::num::ParseFloatError;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::processing::statistics::{Mode, StatisticsResult, NOT_APPLICABLE};

pub const HEADER: [&str; 8] = [
    "TC",
    "COUNT",
    "MEAN",
    "MEDIAN",
    "MODE",
    "SD",
    "VARIANCE",
    "Elapsed Time (s)",
];

/// Separator between tied mode values inside the MODE column.
pub const MODE_SEPARATOR: char = ',';

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot write report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed report {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl ReportError {
    fn io(path: &Path, source: io::Error) -> Self {
        ReportError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        ReportError::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

/// How statistic columns are rendered. Elapsed time always uses 6 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    /// Shortest text that parses back to the same `f64`.
    Raw,
    Fixed(usize),
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat::Fixed(2)
    }
}

impl NumberFormat {
    pub fn format(&self, v: f64) -> String {
        match *self {
            NumberFormat::Raw => v.to_string(),
            NumberFormat::Fixed(decimals) => format!("{v:.decimals$}"),
        }
    }

    fn format_opt(&self, v: Option<f64>) -> String {
        v.map(|v| self.format(v)).unwrap_or_default()
    }
}

/// One line of the report: a case label, its statistics and how long they took.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub case_id: String,
    pub stats: StatisticsResult,
    pub elapsed_seconds: f64,
}

impl ReportRow {
    /// Format as a multi-line console summary, numbers rendered like the report columns.
    pub fn summary(&self, format: NumberFormat) -> String {
        let s = &self.stats;
        let show = |v: Option<f64>| v.map(|v| format.format(v)).unwrap_or_else(|| "n/a".into());
        let mode = match &s.mode {
            None => "n/a".to_string(),
            Some(m) => format_mode(m, format, ", "),
        };
        format!(
            concat!(
                "{}:\n  Count: {}\n  Mean: {}\n  Median: {}\n  Mode: {}\n",
                "  Variance: {}\n  Std Dev: {}\n  Elapsed Time (s): {:.6}\n"
            ),
            self.case_id,
            s.count,
            show(s.mean),
            show(s.median),
            mode,
            show(s.variance),
            show(s.standard_deviation),
            self.elapsed_seconds
        )
    }

    fn fields(&self, format: NumberFormat) -> [String; 8] {
        let s = &self.stats;
        let separator = MODE_SEPARATOR.to_string();
        let mode = match &s.mode {
            None => String::new(),
            Some(m) => format_mode(m, format, &separator),
        };
        [
            self.case_id.clone(),
            s.count.to_string(),
            format.format_opt(s.mean),
            format.format_opt(s.median),
            mode,
            format.format_opt(s.standard_deviation),
            format.format_opt(s.variance),
            format!("{:.6}", self.elapsed_seconds),
        ]
    }
}

fn format_mode(mode: &Mode, format: NumberFormat, separator: &str) -> String {
    match mode {
        Mode::NotApplicable => NOT_APPLICABLE.to_string(),
        m => m
            .values()
            .iter()
            .map(|v| format.format(*v))
            .collect::<Vec<_>>()
            .join(separator),
    }
}

/// Append `row` to the report at `path` using the default number format.
pub fn append(row: &ReportRow, path: &Path) -> Result<(), ReportError> {
    append_with(row, path, NumberFormat::default())
}

/// Append `row` to the report at `path`.
/// The header is written first when the file does not exist yet (or is empty).
/// Existing rows are never rewritten.
pub fn append_with(
    row: &ReportRow,
    path: &Path,
    format: NumberFormat,
) -> Result<(), ReportError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ReportError::io(path, e))?;
    let needs_header = file.metadata().map_err(|e| ReportError::io(path, e))?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        writer
            .write_record(HEADER)
            .map_err(|e| ReportError::csv(path, e))?;
    }
    writer
        .write_record(row.fields(format))
        .map_err(|e| ReportError::csv(path, e))?;
    writer.flush().map_err(|e| ReportError::io(path, e))?;

    tracing::debug!("Appended row {:?} to {:?}", row.case_id, path);
    Ok(())
}

/// A report line read back from disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportRecord {
    #[serde(rename = "TC")]
    pub case_id: String,
    #[serde(rename = "COUNT")]
    pub count: usize,
    #[serde(rename = "MEAN")]
    pub mean: Option<f64>,
    #[serde(rename = "MEDIAN")]
    pub median: Option<f64>,
    #[serde(rename = "MODE")]
    pub mode: String,
    #[serde(rename = "SD")]
    pub standard_deviation: Option<f64>,
    #[serde(rename = "VARIANCE")]
    pub variance: Option<f64>,
    #[serde(rename = "Elapsed Time (s)")]
    pub elapsed_seconds: f64,
}

impl ReportRecord {
    /// Parse the MODE column. An empty cell means the sample was empty.
    pub fn parsed_mode(&self) -> Result<Option<Mode>, ParseFloatError> {
        let text = self.mode.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if text == NOT_APPLICABLE {
            return Ok(Some(Mode::NotApplicable));
        }
        let mut values = text
            .split(MODE_SEPARATOR)
            .map(|t| t.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(if values.len() == 1 {
            Mode::Single(values.remove(0))
        } else {
            Mode::Tied(values)
        }))
    }
}

/// Read every data row of a report written by [`append_with`].
pub fn read_report(path: &Path) -> Result<Vec<ReportRecord>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .map_err(|e| ReportError::csv(path, e))?;

    reader
        .deserialize()
        .collect::<Result<Vec<ReportRecord>, _>>()
        .map_err(|e| ReportError::csv(path, e))
}
