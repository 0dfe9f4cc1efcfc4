//! The run-level operations behind each CLI command.
//!
//! [`build_events`] and [`combine_events`] are pure and work on in-memory
//! collections. The remaining functions wrap them with the file store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::Paths;
use crate::dates;
use crate::dedup::dedupe_with_stats;
use crate::fetch::{HttpClient, fetch_json};
use crate::flatten::flatten_all;
use crate::listing::{FeedEntry, ListingRow, join_dates};
use crate::merge::merge_with_stats;
use crate::model::{DetailDocument, FlattenedEvent, RawEvent};
use crate::output::{write_json, write_partitions};
use crate::partition::{EventPartition, partition};
use crate::stats::RunStats;
use crate::store;

/// Listing rows plus the date feed, joined and deduplicated.
pub fn build_events(rows: Vec<ListingRow>, feed: &[FeedEntry], stats: &mut RunStats) -> Vec<RawEvent> {
    let joined = join_dates(rows, feed, stats);
    dedupe_with_stats(joined, stats)
}

/// Dedup, merge, flatten and partition, in that order.
pub fn combine_events(
    base: Vec<RawEvent>,
    details: &[DetailDocument],
    stats: &mut RunStats,
) -> EventPartition {
    let unique = dedupe_with_stats(base, stats);
    let merged = merge_with_stats(unique, details, stats);
    let flattened = flatten_all(&merged, stats);

    stats.global_events += flattened
        .iter()
        .filter(|e| dates::is_global(e.start.as_deref()))
        .count();

    let parts = partition(flattened);
    stats.event_types = parts.type_count();
    parts
}

/// Builds the base dataset from a listing file and the date feed and
/// writes it to the events file. A feed that cannot be loaded leaves every
/// event without dates rather than failing the run.
#[tracing::instrument(skip_all, fields(feed = %feed_source, listing = %listing_path.display()))]
pub async fn build_base<C: HttpClient>(
    client: &C,
    paths: &Paths,
    feed_source: &str,
    listing_path: &Path,
    stats: &mut RunStats,
) -> Result<usize> {
    let listing = std::fs::read(listing_path)
        .with_context(|| format!("failed to read listing {}", listing_path.display()))?;
    let rows: Vec<ListingRow> = serde_json::from_slice(&listing)
        .with_context(|| format!("invalid listing {}", listing_path.display()))?;

    let feed: Vec<FeedEntry> = match fetch_json(client, feed_source).await {
        Ok(feed) => feed,
        Err(e) => {
            error!(error = %e, "Failed to load events feed, dates will be null");
            Vec::new()
        }
    };

    let events = build_events(rows, &feed, stats);
    write_json(&paths.events(), &events)?;

    info!(events = events.len(), "Wrote base dataset");
    Ok(events.len())
}

/// Merges the staged detail documents into the base dataset and writes the
/// unified and per-type outputs.
///
/// # Errors
///
/// Fails when the base dataset cannot be read. A missing or partly broken
/// detail directory is not an error.
#[tracing::instrument(skip_all, fields(data_dir = %paths.data_dir().display(), keep_details = keep_details))]
pub fn combine(paths: &Paths, keep_details: bool, stats: &mut RunStats) -> Result<EventPartition> {
    let base = store::read_events(&paths.events(), stats)?;
    let details = store::load_detail_documents(&paths.details(), stats);

    let parts = combine_events(base, &details, stats);

    write_json(&paths.events(), &parts.sorted)?;
    write_partitions(&paths.event_types(), &parts)?;

    if !keep_details {
        store::remove_detail_dir(&paths.details())?;
    }

    info!(
        events = parts.len(),
        event_types = parts.type_count(),
        details_applied = stats.details_applied,
        "Combined event details"
    );
    Ok(parts)
}

/// Re-flattens the dataset at `path` in place, keeping record order.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn reflatten(path: &Path, stats: &mut RunStats) -> Result<Vec<FlattenedEvent>> {
    let events = store::read_events(path, stats)?;
    let flattened = flatten_all(&events, stats);

    write_json(path, &flattened)?;

    info!(
        events = flattened.len(),
        already_flattened = stats.already_flattened,
        "Re-flattened dataset"
    );
    Ok(flattened)
}

/// Stages one detail document for the next combine.
pub fn stage_detail(paths: &Paths, doc: &DetailDocument, suffix: &str) -> Result<PathBuf> {
    store::write_detail_document(&paths.details(), doc, suffix)
}
