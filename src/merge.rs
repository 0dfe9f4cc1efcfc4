//! Overlays per-event detail documents onto the deduplicated base records.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::DetailError;
use crate::model::{DetailDocument, RawEvent};
use crate::stats::RunStats;

/// Merges `details` onto `base`. See [`merge_with_stats`].
pub fn merge(base: Vec<RawEvent>, details: &[DetailDocument]) -> Vec<RawEvent> {
    merge_with_stats(base, details, &mut RunStats::default())
}

/// Applies every detail document to the base record with the same id, in
/// the order the documents are given. Keys of a later document overwrite
/// those of an earlier one; arrays and objects are replaced, never merged.
///
/// Nothing here aborts the batch. Documents are skipped when their kind is
/// unknown, when no base record has their id, or when their payload cannot
/// be overlaid; each case is logged and counted in `stats`.
pub fn merge_with_stats(
    base: Vec<RawEvent>,
    details: &[DetailDocument],
    stats: &mut RunStats,
) -> Vec<RawEvent> {
    let mut records = base;

    let mut by_id: HashMap<String, Vec<usize>> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        by_id.entry(record.id.clone()).or_default().push(i);
    }

    for doc in details {
        stats.detail_documents += 1;

        if !doc.detail_kind().is_known() {
            stats.details_unknown_kind += 1;
            debug!(event_id = %doc.id, kind = %doc.kind, "Skipping detail of unknown kind");
            continue;
        }

        let Some(slots) = by_id.get(&doc.id) else {
            stats.details_unmatched += 1;
            debug!(event_id = %doc.id, kind = %doc.kind, "No base event for detail document");
            continue;
        };

        for &slot in slots {
            match apply(&records[slot], doc) {
                Ok(merged) => {
                    records[slot] = merged;
                    stats.details_applied += 1;
                }
                Err(e) => {
                    stats.details_malformed += 1;
                    warn!(event_id = %doc.id, kind = %doc.kind, error = %e, "Skipping malformed detail document");
                }
            }
        }
    }

    records
}

/// Returns `record` with the document's data written over it.
pub fn apply(record: &RawEvent, doc: &DetailDocument) -> Result<RawEvent, DetailError> {
    let data = doc.data.as_object().ok_or_else(|| DetailError::NotAnObject {
        id: doc.id.clone(),
        kind: doc.kind.clone(),
    })?;

    record
        .overlay(data)
        .map_err(|source| DetailError::InvalidOverlay {
            id: doc.id.clone(),
            kind: doc.kind.clone(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, kind: &str, data: serde_json::Value) -> DetailDocument {
        DetailDocument::new(id, kind, data)
    }

    #[test]
    fn test_later_document_wins() {
        let base = vec![RawEvent::new("e1")];
        let details = vec![
            doc("e1", "generic", json!({"hasBonuses": true})),
            doc(
                "e1",
                "community-day",
                json!({"hasBonuses": false, "spawns": [{"name": "Bulbasaur"}]}),
            ),
        ];

        let merged = merge(base, &details);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].details.has_bonuses, Some(json!(false)));
        assert_eq!(
            merged[0].details.spawns,
            Some(json!([{"name": "Bulbasaur"}]))
        );
    }

    #[test]
    fn test_unmatched_document_ignored() {
        let mut stats = RunStats::default();
        let base = vec![RawEvent::new("e1")];
        let details = vec![doc("missing", "generic", json!({"hasSpawns": true}))];

        let merged = merge_with_stats(base.clone(), &details, &mut stats);

        assert_eq!(merged, base);
        assert_eq!(stats.details_unmatched, 1);
        assert_eq!(stats.details_applied, 0);
    }

    #[test]
    fn test_malformed_document_skipped_rest_applied() {
        let mut stats = RunStats::default();
        let base = vec![RawEvent::new("e1"), RawEvent::new("e2")];
        let details = vec![
            doc("e1", "generic", json!({"start": 12})),
            doc("e1", "promo-codes", json!(["CODE1", "CODE2"])),
            doc("e2", "raid-day", json!({"bosses": [{"name": "Mewtwo"}]})),
        ];

        let merged = merge_with_stats(base, &details, &mut stats);

        assert_eq!(merged[0], RawEvent::new("e1"));
        assert_eq!(merged[1].details.bosses, Some(json!([{"name": "Mewtwo"}])));
        assert_eq!(stats.details_malformed, 2);
        assert_eq!(stats.details_applied, 1);
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let mut stats = RunStats::default();
        let base = vec![RawEvent::new("e1")];
        let details = vec![doc("e1", "mystery-box", json!({"bonuses": ["x"]}))];

        let merged = merge_with_stats(base, &details, &mut stats);

        assert_eq!(merged[0].details.bonuses, None);
        assert_eq!(stats.details_unknown_kind, 1);
    }

    #[test]
    fn test_no_documents_passes_through() {
        let base = vec![RawEvent::new("e1"), RawEvent::new("e2")];
        assert_eq!(merge(base.clone(), &[]), base);
    }

    #[test]
    fn test_document_order_not_record_order() {
        // documents for different events can arrive in any order
        let base = vec![RawEvent::new("a"), RawEvent::new("b")];
        let details = vec![
            doc("b", "generic", json!({"description": "B"})),
            doc("a", "generic", json!({"description": "A"})),
        ];

        let merged = merge(base, &details);

        assert_eq!(merged[0].details.description, Some(json!("A")));
        assert_eq!(merged[1].details.description, Some(json!("B")));
    }

    #[test]
    fn test_payload_id_does_not_move_record() {
        let base = vec![RawEvent::new("e1")];
        let details = vec![
            doc("e1", "generic", json!({"id": "e2", "hasSpawns": true})),
            doc("e1", "community-day", json!({"bonuses": ["3x Stardust"]})),
        ];
        let mut stats = RunStats::default();

        let merged = merge_with_stats(base, &details, &mut stats);

        assert_eq!(merged[0].id, "e1");
        assert_eq!(merged[0].details.bonuses, Some(json!(["3x Stardust"])));
        assert_eq!(stats.details_applied, 2);
    }

    #[test]
    fn test_apply_reports_non_object_data() {
        let err = apply(&RawEvent::new("e1"), &doc("e1", "generic", json!(null))).unwrap_err();
        assert!(matches!(err, DetailError::NotAnObject { .. }));
    }
}
