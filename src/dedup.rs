//! Collapses listing rows that share an event id.
//!
//! The events page lists an event once per section it appears in, and the
//! occurrences can carry complementary halves of the date range: one has
//! `start`, the other `end`. Grouping is done with a hash map so the pass
//! stays linear in the number of rows.

use std::collections::HashMap;

use tracing::debug;

use crate::model::RawEvent;
use crate::stats::RunStats;

/// Deduplicates `records` by id. See [`dedupe_with_stats`].
pub fn dedupe(records: Vec<RawEvent>) -> Vec<RawEvent> {
    dedupe_with_stats(records, &mut RunStats::default())
}

/// Deduplicates `records` by id, keeping one record per id in order of
/// first appearance.
///
/// A duplicate group becomes a copy of its first member whose `start`/`end`
/// are reconciled with the second member:
/// - first has a start: keep its start, take the second's end
/// - otherwise: take the second's start, keep the first's end
///
/// Only the first two members of a group take part. A third or later
/// occurrence is ignored and counted in `stats.ignored_duplicates`.
pub fn dedupe_with_stats(records: Vec<RawEvent>, stats: &mut RunStats) -> Vec<RawEvent> {
    stats.raw_records += records.len();

    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut groups: Vec<Vec<RawEvent>> = Vec::new();

    for record in records {
        match index.get(&record.id) {
            Some(&slot) => groups[slot].push(record),
            None => {
                index.insert(record.id.clone(), groups.len());
                groups.push(vec![record]);
            }
        }
    }

    let deduplicated: Vec<RawEvent> = groups
        .into_iter()
        .filter_map(|group| reconcile(group, stats))
        .collect();

    stats.deduplicated += deduplicated.len();
    deduplicated
}

fn reconcile(group: Vec<RawEvent>, stats: &mut RunStats) -> Option<RawEvent> {
    let size = group.len();
    let mut members = group.into_iter();
    let mut merged = members.next()?;
    let Some(second) = members.next() else {
        return Some(merged);
    };

    stats.duplicate_groups += 1;
    if size > 2 {
        stats.oversized_groups += 1;
        stats.ignored_duplicates += size - 2;
        debug!(
            event_id = %merged.id,
            group_size = size,
            "Duplicate group larger than two, extra occurrences ignored"
        );
    }

    if merged.has_start() {
        merged.end = second.end;
    } else {
        merged.start = second.start;
    }

    Some(merged)
}
