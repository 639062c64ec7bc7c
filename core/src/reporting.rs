use crate::operations::CollisionPolicy;
use crate::resolution::ResolutionTarget;
use crate::sorter::{FileAction, SortConfig, SortOutcome};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const REPORT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SortReport<'a> {
    version: u32,
    generated_at: String,
    main_dir: &'a Path,
    quarantine_dir: &'a Path,
    target: ResolutionTarget,
    thresholds: (f64, f64),
    collision: CollisionPolicy,
    dry_run: bool,
    scanned: usize,
    restored: &'a [FileAction],
    quarantined: &'a [FileAction],
    probe_failures: &'a [PathBuf],
    skipped_collisions: &'a [PathBuf],
}

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("io error for {}: {source}", .path.display())]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub fn print_summary(outcome: &SortOutcome, config: &SortConfig) {
    if outcome.dry_run {
        println!("\nDry run complete, no files were moved.");
    } else {
        println!("\nCleanup Complete.");
    }
    println!(
        "Moved {} low-resolution images to {}",
        outcome.moved_count(),
        config.quarantine_dir.display()
    );
    println!(
        "Restored {} images to {}",
        outcome.restored_count(),
        config.main_dir.display()
    );
    if !outcome.probe_failures.is_empty() {
        println!(
            "Skipped {} files whose dimensions could not be read",
            outcome.probe_failures.len()
        );
    }
    if !outcome.skipped_collisions.is_empty() {
        println!(
            "Skipped {} files because the destination name was taken",
            outcome.skipped_collisions.len()
        );
    }
}

/// Writes the outcome as pretty-printed JSON, creating parent directories.
pub fn write_json(
    outcome: &SortOutcome,
    config: &SortConfig,
    output_path: &Path,
) -> Result<(), ReportingError> {
    let report = SortReport {
        version: REPORT_VERSION,
        generated_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("unknown")),
        main_dir: &config.main_dir,
        quarantine_dir: &config.quarantine_dir,
        target: config.target,
        thresholds: config.target.thresholds(),
        collision: config.collision,
        dry_run: outcome.dry_run,
        scanned: outcome.scanned,
        restored: &outcome.restored,
        quarantined: &outcome.quarantined,
        probe_failures: &outcome.probe_failures,
        skipped_collisions: &outcome.skipped_collisions,
    };

    let io_error = |source| ReportingError::Io {
        source,
        path: output_path.to_path_buf(),
    };
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(output_path).map_err(io_error)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &report)?;
    Ok(())
}
