mod cli;
mod logging;

use clap::Parser;
use cli::{Cli, CliConfig};
use std::process::ExitCode;
use wallsort_core::{print_summary, progress, sort, write_json, IdentifyProbe, SortError};

/// Distinct status so schedulers can tell a misconfigured path from a no-op run.
const EXIT_MISSING_MAIN_DIR: u8 = 3;
const EXIT_FAILURE: u8 = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.into_config() {
        Ok(config) => run_sort(config),
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn exit_code_for(error: &SortError) -> u8 {
    match error {
        SortError::MissingMainDirectory(_) => EXIT_MISSING_MAIN_DIR,
        _ => EXIT_FAILURE,
    }
}

fn run_sort(config: CliConfig) -> ExitCode {
    let probe = IdentifyProbe::with_program(&config.identify);
    let progress_bar = progress::new_bar();

    let outcome = match sort(&config.sort, &probe, &progress_bar) {
        Ok(outcome) => outcome,
        Err(error) => {
            match &error {
                SortError::MissingMainDirectory(path) => {
                    eprintln!("Directory not found: {}", path.display())
                }
                _ => eprintln!("Error: {}", error),
            }
            return ExitCode::from(exit_code_for(&error));
        }
    };

    print_summary(&outcome, &config.sort);

    if let Some(report_path) = config.report.as_ref() {
        match write_json(&outcome, &config.sort, report_path) {
            Ok(()) => println!("Report written to {}", report_path.display()),
            Err(error) => {
                eprintln!("Error writing report to {}: {}", report_path.display(), error);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
