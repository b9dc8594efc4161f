//! Command implementations for pipediff CLI

use crate::aggregate::AggSpec;
use crate::cli::{CaptureArgs, Commands, OutputFormat};
use crate::compare::{compare_pair, dtypes_table, schema_drift, LevelOrder};
use crate::error::{PipediffError, Result};
use crate::frame::Frame;
use crate::frame_diff::FrameDiff;
use crate::logger::{CaptureOptions, CaptureOverrides, SnapshotLogger};
use crate::output::{JsonFormatter, PrettyPrinter};
use std::path::{Path, PathBuf};

/// Aggregations used when neither a config file nor `--agg` picks any.
/// They apply to columns of every dtype.
pub const DEFAULT_AGGREGATIONS: [&str; 3] = ["count", "nans", "nunique"];

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Compare {
            left,
            right,
            capture,
            entries_first,
            format,
        } => compare_command(&left, &right, &capture, entries_first, &format),
        Commands::Dtypes { files, format } => dtypes_command(&files, &format),
        Commands::Show {
            file,
            capture,
            format,
        } => show_command(&file, &capture, &format),
        Commands::Diff {
            left,
            right,
            format,
        } => diff_command(&left, &right, &format),
    }
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::parse(format).map_err(PipediffError::invalid_input)
}

/// Logger defaults and per-call overrides from the capture flags
pub fn capture_settings(capture: &CaptureArgs) -> Result<(SnapshotLogger, CaptureOverrides)> {
    let defaults = match &capture.config {
        Some(path) => {
            log::debug!("Loading capture options from {}", path.display());
            CaptureOptions::from_json_file(path)?
        }
        None => CaptureOptions {
            agg: Some(AggSpec::names(&DEFAULT_AGGREGATIONS)),
            dtypes: true,
            shape: true,
            ..Default::default()
        },
    };

    let mut overrides = CaptureOverrides::new();
    if let Some(agg) = &capture.agg {
        overrides.set("agg", agg)?;
    }
    if let Some(columns) = &capture.columns {
        overrides.set("column_labels", columns)?;
    }
    if let Some(rows) = &capture.rows {
        overrides.set("row_labels", rows)?;
    }
    for assignment in &capture.overrides {
        overrides.set_assignment(assignment)?;
    }

    Ok((SnapshotLogger::new(defaults), overrides))
}

/// Snapshot key for a dataset file: its stem, or the full path when the
/// stem is already taken
fn entry_key(path: &Path, logger: &SnapshotLogger) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty());
    match stem {
        Some(stem) if !logger.logs().contains_key(&stem) => stem,
        _ => path.display().to_string(),
    }
}

fn load(path: &Path) -> Result<Frame> {
    let frame = Frame::from_json_file(path)?;
    log::info!(
        "Loaded {} ({} rows, {} columns)",
        path.display(),
        frame.n_rows(),
        frame.n_columns()
    );
    Ok(frame)
}

/// Snapshot two datasets and compare them
fn compare_command(
    left: &Path,
    right: &Path,
    capture: &CaptureArgs,
    entries_first: bool,
    format: &str,
) -> Result<()> {
    let format = parse_format(format)?;
    let (mut logger, overrides) = capture_settings(capture)?;

    for path in [left, right] {
        let frame = load(path)?;
        let key = entry_key(path, &logger);
        logger.log(&frame, Some(&key), &overrides)?;
    }

    let order = if entries_first {
        LevelOrder::EntriesFirst
    } else {
        LevelOrder::ColumnsFirst
    };
    let logs = logger.logs();
    let table = compare_pair(logs, 0isize, 1isize, order)?;
    let drift = schema_drift(logs, 0isize, 1isize)?;

    match format {
        OutputFormat::Pretty => {
            PrettyPrinter::print_comparison(&table);
            println!();
            PrettyPrinter::print_schema_drift(&drift);
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "comparison": table,
                "schema_drift": drift,
            });
            println!("{}", JsonFormatter::format(&json)?);
        }
    }

    Ok(())
}

/// Tabulate recorded dtypes across datasets
fn dtypes_command(files: &[PathBuf], format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let mut logger = SnapshotLogger::new(CaptureOptions {
        dtypes: true,
        ..Default::default()
    });

    for path in files {
        let frame = load(path)?;
        let key = entry_key(path, &logger);
        logger.log_frame(&frame, Some(&key))?;
    }

    let table = dtypes_table(logger.logs());
    match format {
        OutputFormat::Pretty => PrettyPrinter::print_dtypes(&table),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&table)?),
    }

    Ok(())
}

/// Capture and print one snapshot
fn show_command(file: &Path, capture: &CaptureArgs, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let (mut logger, overrides) = capture_settings(capture)?;

    let frame = load(file)?;
    let key = entry_key(file, &logger);
    let snapshot = logger.log(&frame, Some(&key), &overrides)?;

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_snapshot(&key, &snapshot),
        OutputFormat::Json => {
            let json = serde_json::json!({ "key": key, "snapshot": snapshot.as_ref() });
            println!("{}", JsonFormatter::format(&json)?);
        }
    }

    Ok(())
}

/// Label and cell differences of two datasets
fn diff_command(left: &Path, right: &Path, format: &str) -> Result<()> {
    let format = parse_format(format)?;
    let (left, right) = (load(left)?, load(right)?);

    let diff = FrameDiff::new(&left, &right);
    let columns = diff.columns();
    let rows = diff.rows();
    let changes = diff.compare_intersection();

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_frame_diff(&columns, &rows, &changes),
        OutputFormat::Json => println!("{}", JsonFormatter::format_frame_diff(&columns, &rows, &changes)?),
    }

    Ok(())
}
