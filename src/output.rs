//! Output formatting and persistence for datasets and run statistics.
//!
//! Supports pretty-printing, minified JSON datasets, per-type files, and
//! CSV append of the run history.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::partition::EventPartition;
use crate::stats::RunStats;
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Logs run statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &RunStats) {
    debug!("{:#?}", stats);
}

/// Writes `value` as minified JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let bytes = serde_json::to_vec(value)?;
    fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Wrote JSON file");
    Ok(())
}

/// Writes one `<token>.min.json` per partition group into `dir`.
///
/// Existing `*.json` files in `dir` are removed first so types that
/// disappeared since the last run leave nothing behind. Returns the number
/// of files written.
pub fn write_partitions(dir: &Path, partition: &EventPartition) -> Result<usize> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove stale {}", path.display()))?;
            removed += 1;
        }
    }

    for (token, events) in &partition.by_type {
        write_json(&dir.join(format!("{token}.min.json")), events)?;
    }

    info!(
        dir = %dir.display(),
        written = partition.by_type.len(),
        removed,
        "Generated event type files"
    );
    Ok(partition.by_type.len())
}

/// Appends a [`RunStats`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &Path, run_stats: &RunStats) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(run_stats)?;
    writer.flush()?;

    Ok(())
}
