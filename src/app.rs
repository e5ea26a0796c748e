use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;

use crate::cli::Cli;
use crate::data::loader;
use crate::processing::report::{self, ReportRow};
use crate::processing::statistics::{self, StatisticsResult};
use crate::state::config::RunConfig;

/// What happened to one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOutcome {
    Reported,
    /// Input file does not exist. No row written.
    Missing,
    /// Input file has no parseable numbers. No row written.
    Empty,
    /// Reading the input or writing its row failed. Later inputs still run.
    Failed,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reported: usize,
    pub skipped: Vec<(PathBuf, CaseOutcome)>,
    pub report_path: PathBuf,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Serialize)]
struct CaseJson<'a> {
    case_id: &'a str,
    rejected_lines: usize,
    elapsed_seconds: f64,
    stats: &'a StatisticsResult,
}

/// Resolve settings, prepare the output directory and process every input in order.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<RunSummary> {
    let mut config = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate()?;
    tracing::debug!("Effective config: {:?}", config);

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("cannot create output directory {:?}", cli.output_dir))?;
    let report_path = cli.output_dir.join(&config.report_name);

    let mut summary = RunSummary {
        report_path: report_path.clone(),
        ..Default::default()
    };
    for input in &cli.inputs {
        let outcome = process_input(input, &report_path, &config, cli.json, out)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to process {:?}: {e:#}", input);
                CaseOutcome::Failed
            });
        match outcome {
            CaseOutcome::Reported => summary.reported += 1,
            skipped => summary.skipped.push((input.clone(), skipped)),
        }
    }

    tracing::info!(
        "{} of {} inputs reported to {:?}",
        summary.reported,
        cli.inputs.len(),
        report_path
    );
    Ok(summary)
}

/// Load, compute and append one report row for `input`.
pub fn process_input<W: Write>(
    input: &Path,
    report_path: &Path,
    config: &RunConfig,
    json: bool,
    out: &mut W,
) -> anyhow::Result<CaseOutcome> {
    tracing::info!("Processing file: {:?}", input);
    let start = Instant::now();

    let sample = loader::load_file(input)?;
    if !sample.source_found {
        tracing::error!("File {:?} not found, no report row written", input);
        return Ok(CaseOutcome::Missing);
    }
    let stats = statistics::compute(&sample.values, &config.stats_options());
    let elapsed = start.elapsed().as_secs_f64();

    tracing::info!(
        "Total values processed: {}, invalid values ignored: {}",
        sample.values.len(),
        sample.rejected_count
    );
    if sample.is_empty() {
        tracing::error!("No valid numbers found in {:?}, no report row written", input);
        return Ok(CaseOutcome::Empty);
    }

    let row = ReportRow {
        case_id: case_id(input),
        stats,
        elapsed_seconds: elapsed,
    };
    if json {
        let case = CaseJson {
            case_id: &row.case_id,
            rejected_lines: sample.rejected_count,
            elapsed_seconds: elapsed,
            stats: &row.stats,
        };
        serde_json::to_writer_pretty(&mut *out, &case)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", row.summary(config.number_format))?;
    }

    report::append_with(&row, report_path, config.number_format)?;
    tracing::info!("Results appended to {:?}", report_path);
    Ok(CaseOutcome::Reported)
}

/// Report label for an input: its file name without the extension.
pub fn case_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
