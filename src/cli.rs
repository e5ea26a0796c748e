use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::processing::report::NumberFormat;
use crate::processing::statistics::{ModeTiePolicy, VariancePolicy};
use crate::state::config::RunConfig;

#[derive(Parser, Debug)]
#[command(
    name = "oxidestats",
    version,
    about = "Descriptive statistics for files of newline-separated numbers"
)]
pub struct Cli {
    /// Input files, one number per line. Processed in order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Directory receiving the report; created when absent
    #[arg(short, long)]
    pub output_dir: PathBuf,
    /// JSON file with run settings; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Variance divisor: n (population) or n-1 (sample)
    #[arg(long, value_enum)]
    pub variance: Option<VariancePolicy>,
    /// Mode reported when several values tie
    #[arg(long, value_enum)]
    pub mode_ties: Option<ModeTiePolicy>,
    /// Write statistics unrounded
    #[arg(long, conflicts_with = "decimals")]
    pub raw: bool,
    /// Decimal places for statistics in the report
    #[arg(long)]
    pub decimals: Option<usize>,
    /// Scale-down factor applied before summing very large magnitudes
    #[arg(long)]
    pub scale: Option<f64>,
    /// Report file name inside the output directory
    #[arg(long)]
    pub report_name: Option<String>,
    /// Print each result as JSON instead of text
    #[arg(long)]
    pub json: bool,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Overlay command-line flags onto `config`.
    pub fn apply_overrides(&self, config: &mut RunConfig) {
        if let Some(v) = self.variance {
            config.variance = v;
        }
        if let Some(m) = self.mode_ties {
            config.mode_ties = m;
        }
        if self.raw {
            config.number_format = NumberFormat::Raw;
        } else if let Some(d) = self.decimals {
            config.number_format = NumberFormat::Fixed(d);
        }
        if self.scale.is_some() {
            config.precision_scale = self.scale;
        }
        if let Some(name) = &self.report_name {
            config.report_name = name.clone();
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::INFO,
            (false, 1) => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_and_override() {
        let cli = Cli::try_parse_from([
            "oxidestats",
            "data/TC1.txt",
            "data/TC2.txt",
            "-o",
            "results",
            "--variance",
            "sample",
            "--mode-ties",
            "sentinel",
            "--decimals",
            "3",
            "--scale",
            "1e18",
        ])
        .unwrap();
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.output_dir, PathBuf::from("results"));

        let mut config = RunConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.variance, VariancePolicy::Sample);
        assert_eq!(config.mode_ties, ModeTiePolicy::Sentinel);
        assert_eq!(config.number_format, NumberFormat::Fixed(3));
        assert_eq!(config.precision_scale, Some(1e18));
    }

    #[test]
    fn test_flags_leave_config_alone_when_absent() {
        let cli = Cli::try_parse_from(["oxidestats", "a.txt", "-o", "out"]).unwrap();
        let mut config = RunConfig {
            variance: VariancePolicy::Sample,
            number_format: NumberFormat::Raw,
            ..Default::default()
        };
        let before = config.clone();
        cli.apply_overrides(&mut config);
        assert_eq!(config, before);
        assert_eq!(cli.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_requires_input_and_output_dir() {
        assert!(Cli::try_parse_from(["oxidestats", "-o", "out"]).is_err());
        assert!(Cli::try_parse_from(["oxidestats", "a.txt"]).is_err());
        assert!(Cli::try_parse_from([
            "oxidestats",
            "a.txt",
            "-o",
            "out",
            "--raw",
            "--decimals",
            "1"
        ])
        .is_err());
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["oxidestats", "a.txt", "-o", "out", "-vv"]).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::TRACE);
        let cli = Cli::try_parse_from(["oxidestats", "a.txt", "-o", "out", "-q"]).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::ERROR);
    }
}
