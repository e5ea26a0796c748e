use std::process::ExitCode;

use clap::Parser;
use oxidestats::app;
use oxidestats::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the per-case summaries.
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut stdout = std::io::stdout().lock();
    match app::run(&cli, &mut stdout) {
        Ok(summary) if summary.is_success() => ExitCode::SUCCESS,
        Ok(summary) => {
            for (path, outcome) in &summary.skipped {
                tracing::warn!("Skipped {:?}: {:?}", path, outcome);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
