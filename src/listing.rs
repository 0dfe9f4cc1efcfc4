//! Joins rows scraped from the events page with the events date feed.
//!
//! The page gives the id, name, type and banner of every current and
//! upcoming event. Dates only come from the feed, keyed by the same id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dates;
use crate::model::RawEvent;
use crate::stats::RunStats;

const CDN_ASSETS: &str = "https://cdn.leekduck.com/assets/";

/// One event tile from the events page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingRow {
    #[serde(rename = "eventID", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "eventType", alias = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One entry of the date feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(rename = "eventID", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// Builds one raw event per listing row, in listing order. Rows missing
/// from the feed keep null dates and are counted in
/// `stats.missing_from_feed`. Duplicate rows are left for the deduplicator.
pub fn join_dates(rows: Vec<ListingRow>, feed: &[FeedEntry], stats: &mut RunStats) -> Vec<RawEvent> {
    let dates_by_id: HashMap<&str, &FeedEntry> =
        feed.iter().map(|entry| (entry.id.as_str(), entry)).collect();

    stats.listing_rows += rows.len();

    rows.into_iter()
        .map(|row| {
            let feed_entry = dates_by_id.get(row.id.as_str()).copied();
            if feed_entry.is_none() {
                stats.missing_from_feed += 1;
                warn!(event_id = %row.id, "Event not present in events feed, dates will be null");
            }

            let (start, end) = feed_entry.map_or((None, None), |entry| {
                dates::normalize_pair(entry.start.as_deref(), entry.end.as_deref())
            });
            let event_type = row.event_type.map(|t| t.replace('é', "e"));

            RawEvent {
                heading: event_type.as_deref().map(derive_heading),
                image: row.image.map(|url| canonical_image_url(&url)),
                id: row.id,
                name: row.name,
                event_type,
                start,
                end,
                ..Default::default()
            }
        })
        .collect()
}

/// `"pokemon-spotlight-hour"` → `"Pokemon Spotlight Hour"`.
pub fn derive_heading(event_type: &str) -> String {
    event_type
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Rewrites image-resizing proxy URLs to the plain CDN asset URL.
pub fn canonical_image_url(url: &str) -> String {
    if !url.contains("cdn-cgi") {
        return url.to_string();
    }
    match url.split_once("/assets/") {
        Some((_, asset)) => format!("{CDN_ASSETS}{asset}"),
        None => url.to_string(),
    }
}
