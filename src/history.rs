//! Aggregated sentiment history, read back from the batch store.
//!
//! Every dashboard render rebuilds this from disk; nothing is cached.

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::classify::{ScoredRecord, Sentiment};
use crate::store::{BatchStore, BATCH_COLUMNS};

pub const DEFAULT_RECENT_ROWS: usize = 200;

/// One row of the aggregated view, with a parsed timestamp.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentHeadline {
    pub id: String,
    pub source: Option<String>,
    pub title: String,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    pub sentiment: Sentiment,
    pub prob_pos: f64,
}

impl From<ScoredRecord> for RecentHeadline {
    fn from(r: ScoredRecord) -> Self {
        Self {
            published_at: r.published_at.as_deref().and_then(parse_published_at),
            id: r.id,
            source: r.source,
            title: r.title,
            sentiment: r.sentiment,
            prob_pos: r.prob_pos,
        }
    }
}

/// Deduplicated, time-sorted rows. The column list is present even when
/// there are no rows.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<RecentHeadline>,
}

impl Default for RecentTable {
    fn default() -> Self {
        Self::from_rows(Vec::new())
    }
}

impl RecentTable {
    pub fn from_rows(rows: Vec<RecentHeadline>) -> Self {
        Self {
            columns: BATCH_COLUMNS.to_vec(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Load the newest `batch_cap` batches and reduce them to at most `n` rows.
///
/// Files come newest-first, so on duplicate ids the row from the most
/// recently modified batch survives.
pub fn load_recent(store: &BatchStore, batch_cap: usize, n: usize) -> Result<RecentTable> {
    let files = store.recent_batches(batch_cap)?;
    if files.is_empty() {
        return Ok(RecentTable::default());
    }

    let mut rows = Vec::new();
    for f in &files {
        rows.extend(store.read_batch(f)?);
    }
    let total = rows.len();

    let rows = merge_rows(rows, n);
    tracing::debug!(files = files.len(), total, kept = rows.len(), "recent history loaded");
    Ok(RecentTable::from_rows(rows))
}

/// Drop duplicate ids (first occurrence wins), parse timestamps, sort
/// newest-first with missing timestamps last, keep `n`.
pub fn merge_rows(rows: Vec<ScoredRecord>, n: usize) -> Vec<RecentHeadline> {
    let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut out: Vec<RecentHeadline> = rows
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .map(RecentHeadline::from)
        .collect();

    // stable: equal timestamps keep concatenation order
    out.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    out.truncate(n);
    out
}

/// Best-effort timestamp parsing; anything unrecognized is `None`.
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rec(id: &str, title: &str, published: Option<&str>) -> ScoredRecord {
        ScoredRecord {
            id: id.into(),
            source: None,
            title: title.into(),
            published_at: published.map(str::to_string),
            sentiment: Sentiment::Negative,
            prob_pos: 0.0,
        }
    }

    #[test]
    fn parses_common_provider_formats() {
        let want = Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap();
        assert_eq!(parse_published_at("2024-01-02T10:30:00Z"), Some(want));
        assert_eq!(parse_published_at("2024-01-02T12:30:00+02:00"), Some(want));
        assert_eq!(parse_published_at("Tue, 02 Jan 2024 10:30:00 GMT"), Some(want));
        assert_eq!(parse_published_at("2024-01-02 10:30:00"), Some(want));
        assert_eq!(
            parse_published_at("2024-01-02"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn garbage_timestamps_become_none() {
        assert_eq!(parse_published_at(""), None);
        assert_eq!(parse_published_at("yesterday"), None);
        assert_eq!(parse_published_at("2024-13-45"), None);
    }

    #[test]
    fn first_duplicate_wins() {
        let rows = vec![rec("x", "newer", None), rec("x", "older", None)];
        let out = merge_rows(rows, 10);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "newer");
    }

    #[test]
    fn nulls_sort_last_and_truncation_applies_after_sort() {
        let rows = vec![
            rec("a", "a", Some("2024-01-02")),
            rec("b", "b", None),
            rec("c", "c", Some("2024-01-01")),
            rec("d", "d", Some("not a date")),
        ];
        let out = merge_rows(rows, 3);
        let ids: Vec<_> = out.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn default_table_keeps_schema() {
        let t = RecentTable::default();
        assert!(t.is_empty());
        assert_eq!(
            t.columns,
            vec!["id", "source", "title", "publishedAt", "sentiment", "prob_pos"]
        );
    }
}
