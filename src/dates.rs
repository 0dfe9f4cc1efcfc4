//! Timestamp normalization for event start/end values.
//!
//! The date feed mixes three shapes: bare local wall-clock times, UTC times
//! with a `Z` suffix, and times carrying a numeric offset. Local times mean
//! "this time wherever the player is" and are never shifted. Only offset
//! times are converted, to the equivalent UTC instant.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// How a timestamp string anchors itself in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    /// No zone marker: local wall-clock time.
    Local,
    /// Trailing `Z`.
    Utc,
    /// Trailing `+HHMM`, `-HHMM`, `+HH:MM` or `-HH:MM` after the time portion.
    Offset,
}

fn offset_re() -> &'static Regex {
    static OFFSET_RE: OnceLock<Regex> = OnceLock::new();
    OFFSET_RE.get_or_init(|| {
        Regex::new(r"^(?P<local>.+T[0-9:.]+)(?P<sign>[+-])(?P<hh>\d{2}):?(?P<mm>\d{2})$")
            .expect("valid offset regex")
    })
}

/// Classifies a timestamp by the zone marker it carries.
pub fn classify(ts: &str) -> TimestampKind {
    if ts.ends_with('Z') {
        TimestampKind::Utc
    } else if offset_re().is_match(ts) {
        TimestampKind::Offset
    } else {
        TimestampKind::Local
    }
}

/// Normalizes a feed timestamp.
///
/// - `None` or empty → `None`
/// - local or `Z` timestamps → unchanged
/// - offset timestamps → UTC with millisecond precision and a `Z` suffix
///
/// Strings that look like offset timestamps but cannot be parsed are
/// returned unchanged.
pub fn normalize(ts: Option<&str>) -> Option<String> {
    let ts = ts.filter(|s| !s.is_empty())?;

    match classify(ts) {
        TimestampKind::Local | TimestampKind::Utc => Some(ts.to_string()),
        TimestampKind::Offset => match offset_to_utc(ts) {
            Some(utc) => Some(utc.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => {
                warn!(timestamp = ts, "Failed to parse offset timestamp, keeping as-is");
                Some(ts.to_string())
            }
        },
    }
}

/// Normalizes a start/end pair.
pub fn normalize_pair(start: Option<&str>, end: Option<&str>) -> (Option<String>, Option<String>) {
    (normalize(start), normalize(end))
}

/// True iff the (normalized) timestamp is an absolute UTC instant.
pub fn is_global(ts: Option<&str>) -> bool {
    ts.is_some_and(|s| s.ends_with('Z'))
}

/// Ordering key for chronological sorting.
///
/// Missing and unparseable timestamps sort as the Unix epoch. Local times
/// are compared by their wall-clock value.
pub fn sort_key(ts: Option<&str>) -> NaiveDateTime {
    let epoch = NaiveDateTime::default();
    let Some(ts) = ts.filter(|s| !s.is_empty()) else {
        return epoch;
    };

    let parsed = match classify(ts) {
        TimestampKind::Utc => DateTime::parse_from_rfc3339(ts)
            .ok()
            .map(|dt| dt.naive_utc()),
        TimestampKind::Offset => offset_to_utc(ts).map(|dt| dt.naive_utc()),
        TimestampKind::Local => parse_local(ts).or_else(|| {
            NaiveDate::parse_from_str(ts, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }),
    };

    parsed.unwrap_or(epoch)
}

fn parse_local(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .ok()
}

fn offset_to_utc(ts: &str) -> Option<DateTime<Utc>> {
    let caps = offset_re().captures(ts)?;
    let local = parse_local(&caps["local"])?;
    let hours: i32 = caps["hh"].parse().ok()?;
    let minutes: i32 = caps["mm"].parse().ok()?;
    let mut seconds = hours * 3600 + minutes * 60;
    if &caps["sign"] == "-" {
        seconds = -seconds;
    }

    let offset = FixedOffset::east_opt(seconds)?;
    let dt = offset.from_local_datetime(&local).single()?;
    Some(dt.with_timezone(&Utc))
}
