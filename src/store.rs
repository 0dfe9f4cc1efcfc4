//! Reading and writing the on-disk datasets.
//!
//! The base dataset is one JSON file holding either a flat array of events
//! or, as older runs wrote it, an object keyed by event type. Detail
//! documents live one per file in a directory the detail scrapers write to
//! concurrently.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::DetailError;
use crate::model::{DetailDocument, RawEvent};
use crate::stats::RunStats;

/// Reads the base dataset at `path`.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a JSON array or object.
/// Individual records that do not parse are skipped instead.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn read_events(path: &Path, stats: &mut RunStats) -> Result<Vec<RawEvent>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read base dataset {}", path.display()))?;
    let events = parse_events(&text, stats)
        .with_context(|| format!("failed to parse base dataset {}", path.display()))?;

    info!(events = events.len(), "Loaded base dataset");
    Ok(events)
}

/// Keys kept from a record of the type-keyed shape. That shape nests its
/// content under `details` next to computed `flags`, so only the envelope
/// is carried forward and detail merging rebuilds the rest.
const ENVELOPE_KEYS: [&str; 9] = [
    "eventID", "id", "name", "eventType", "type", "heading", "image", "start", "end",
];

/// Parses a base dataset in either shape into one flat list.
///
/// Records of the type-keyed shape are cut back to their envelope fields.
pub fn parse_events(text: &str, stats: &mut RunStats) -> Result<Vec<RawEvent>> {
    let records: Vec<Value> = match serde_json::from_str::<Value>(text)? {
        Value::Array(records) => records,
        Value::Object(by_type) => by_type
            .into_iter()
            .filter_map(|(_, group)| match group {
                Value::Array(records) => Some(records),
                _ => None,
            })
            .flatten()
            .map(envelope_only)
            .collect(),
        other => bail!("expected an array or an object of arrays, found {}", kind_of(&other)),
    };

    let mut events = Vec::with_capacity(records.len());
    for record in records {
        match RawEvent::from_value(record) {
            Ok(event) => events.push(event),
            Err(e) => {
                stats.base_records_skipped += 1;
                warn!(error = %e, "Skipping unreadable base record");
            }
        }
    }

    Ok(events)
}

fn envelope_only(record: Value) -> Value {
    match record {
        Value::Object(mut fields) => {
            fields.retain(|key, _| ENVELOPE_KEYS.contains(&key.as_str()));
            Value::Object(fields)
        }
        other => other,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses one detail document file.
pub fn parse_detail(text: &str) -> Result<DetailDocument, DetailError> {
    if text.trim().is_empty() {
        return Err(DetailError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

/// Loads every `*.json` document in `dir`, in file name order.
///
/// A missing directory yields no documents. Empty and unparseable files
/// are skipped and counted as malformed.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_detail_documents(dir: &Path, stats: &mut RunStats) -> Vec<DetailDocument> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Unable to scan detail directory, continuing without details");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let file = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| parse_detail(&text).map_err(|e| e.to_string()));

        match parsed {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                stats.details_malformed += 1;
                warn!(file = %file, error = %e, "Skipping malformed detail document");
            }
        }
    }

    debug!(documents = documents.len(), "Loaded detail documents");
    documents
}

/// Replaces every char outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes `doc` to `<id><suffix>.json` under `dir`, creating `dir` if needed.
pub fn write_detail_document(dir: &Path, doc: &DetailDocument, suffix: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create detail directory {}", dir.display()))?;

    let file_name = format!("{}{}.json", sanitize_filename(&doc.id), sanitize_filename(suffix));
    let path = dir.join(file_name);
    fs::write(&path, serde_json::to_vec(doc)?)
        .with_context(|| format!("failed to write detail document {}", path.display()))?;

    debug!(path = %path.display(), kind = %doc.kind, "Wrote detail document");
    Ok(path)
}

/// Removes the detail directory after a combine. A directory that is
/// already gone is not an error.
pub fn remove_detail_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "Removed detail directory");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", dir.display())),
    }
}
