use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one pipeline run. Every stage adds to the same record,
/// which ends up as one row of the run history CSV.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    pub command: Option<String>,

    // listing join
    pub listing_rows: usize,
    pub missing_from_feed: usize,

    // dedup
    pub raw_records: usize,
    pub deduplicated: usize,
    pub duplicate_groups: usize,
    pub oversized_groups: usize,
    pub ignored_duplicates: usize,

    // base load
    pub base_records_skipped: usize,

    // detail merge
    pub detail_documents: usize,
    pub details_applied: usize,
    pub details_malformed: usize,
    pub details_unmatched: usize,
    pub details_unknown_kind: usize,

    // flatten + partition
    pub flattened: usize,
    pub already_flattened: usize,
    pub global_events: usize,
    pub event_types: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl RunStats {
    pub fn new(command: &str) -> Self {
        RunStats {
            timestamp: Utc::now(),
            command: Some(command.to_string()),
            ..Default::default()
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of loaded detail documents that landed on an event.
    pub fn merge_pct(&self) -> f64 {
        Self::pct(self.details_applied, self.detail_documents)
    }

    /// Records the failure that ended the run.
    pub fn with_error(mut self, error_type: &str, error_message: &str) -> Self {
        self.error_type = Some(error_type.to_string());
        self.error_message = Some(error_message.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(RunStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(RunStats::pct(50, 100), 50.0);
        assert_eq!(RunStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_merge_pct() {
        let mut stats = RunStats::new("combine");
        stats.detail_documents = 8;
        stats.details_applied = 6;

        assert_eq!(stats.merge_pct(), 75.0);
    }

    #[test]
    fn test_with_error() {
        let stats = RunStats::new("combine").with_error("base_read", "no such file");

        assert_eq!(stats.command.as_deref(), Some("combine"));
        assert_eq!(stats.error_type.as_deref(), Some("base_read"));
        assert_eq!(stats.error_message.as_deref(), Some("no such file"));
    }
}
