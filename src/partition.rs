//! Groups flattened events by type and orders them chronologically.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::dates;
use crate::model::FlattenedEvent;

/// Bucket for events without a usable type.
pub const UNKNOWN_TYPE: &str = "unknown";

/// The two views written to disk. Both hold the same records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPartition {
    /// Keyed by the sanitized type token, in encounter order within each group.
    pub by_type: BTreeMap<String, Vec<FlattenedEvent>>,
    /// Every event, ascending by start. Missing starts sort first.
    pub sorted: Vec<FlattenedEvent>,
}

impl EventPartition {
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn type_count(&self) -> usize {
        self.by_type.len()
    }
}

fn separator_re() -> &'static Regex {
    static SEPARATOR_RE: OnceLock<Regex> = OnceLock::new();
    // dashes are allowed, but a run mixing dashes and other chars collapses to one
    SEPARATOR_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("valid separator regex"))
}

/// Turns a type tag into a file-name-safe token: lowercase, runs of
/// anything outside `[a-z0-9-]` become one `-`, no leading or trailing `-`.
pub fn sanitize_type(tag: &str) -> String {
    let lowered = tag.to_lowercase();
    let token = separator_re().replace_all(&lowered, "-");
    let token = token.trim_matches('-');

    if token.is_empty() {
        UNKNOWN_TYPE.to_string()
    } else {
        token.to_string()
    }
}

/// The partition key of an event.
pub fn type_token(event: &FlattenedEvent) -> String {
    match event.event_type.as_deref() {
        Some(tag) if !tag.is_empty() => sanitize_type(tag),
        _ => UNKNOWN_TYPE.to_string(),
    }
}

/// Groups `events` by type token and builds the chronological view.
///
/// Types that sanitize to the same token share one group.
pub fn partition(events: Vec<FlattenedEvent>) -> EventPartition {
    let mut by_type: BTreeMap<String, Vec<FlattenedEvent>> = BTreeMap::new();
    for event in &events {
        by_type
            .entry(type_token(event))
            .or_default()
            .push(event.clone());
    }

    let mut sorted = events;
    // stable: equal starts keep their input order
    sorted.sort_by_cached_key(|e| dates::sort_key(e.start.as_deref()));

    EventPartition { by_type, sorted }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, event_type: Option<&str>, start: Option<&str>) -> FlattenedEvent {
        FlattenedEvent {
            id: id.to_string(),
            event_type: event_type.map(String::from),
            start: start.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_sanitize_type() {
        assert_eq!(sanitize_type("Go Battle League!"), "go-battle-league");
        assert_eq!(sanitize_type("community-day"), "community-day");
        assert_eq!(sanitize_type("--Raid  Day--"), "raid-day");
        assert_eq!(sanitize_type("a - b"), "a-b");
        assert_eq!(sanitize_type("!!!"), "unknown");
        assert_eq!(sanitize_type(""), "unknown");
    }

    #[test]
    fn test_missing_type_is_unknown() {
        let result = partition(vec![event("a", None, None), event("b", Some(""), None)]);

        assert_eq!(result.type_count(), 1);
        assert_eq!(result.by_type["unknown"].len(), 2);
    }

    #[test]
    fn test_groups_keep_encounter_order() {
        let result = partition(vec![
            event("late", Some("raid-day"), Some("2024-05-01T10:00:00.000")),
            event("cd", Some("community-day"), Some("2024-01-01T10:00:00.000")),
            event("early", Some("raid-day"), Some("2024-02-01T10:00:00.000")),
        ]);

        let raid_ids: Vec<_> = result.by_type["raid-day"].iter().map(|e| e.id.as_str()).collect();
        assert_eq!(raid_ids, vec!["late", "early"]);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_sorted_by_start_missing_first() {
        let result = partition(vec![
            event("b", Some("event"), Some("2024-03-01T10:00:00.000")),
            event("none", Some("event"), None),
            event("a", Some("event"), Some("2024-01-01T10:00:00.000Z")),
        ]);

        let ids: Vec<_> = result.sorted.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["none", "a", "b"]);
    }

    #[test]
    fn test_colliding_tokens_share_group() {
        let result = partition(vec![
            event("a", Some("Raid Day"), None),
            event("b", Some("raid-day"), None),
        ]);

        assert_eq!(result.type_count(), 1);
        assert_eq!(result.by_type["raid-day"].len(), 2);
    }

    #[test]
    fn test_empty_input() {
        let result = partition(Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.type_count(), 0);
    }
}
