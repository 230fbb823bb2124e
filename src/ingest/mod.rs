// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::path::PathBuf;

use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::classify::Classifier;
use crate::config::AppConfig;
use crate::error::{FetchError, FetchResult};
use crate::ingest::providers::{GoogleNewsProvider, NewsApiProvider};
use crate::ingest::types::{HeadlineRecord, HeadlineSource};

pub const FALLBACK_WARNING: &str = "Primary news source failed. Using fallback.";
pub const EMPTY_FETCH_WARNING: &str = "No headlines fetched";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "fetch_headlines_total",
            "Headlines parsed from each source."
        );
        describe_counter!(
            "fetch_primary_errors_total",
            "Primary source failures that triggered the fallback."
        );
        describe_counter!(
            "fetch_fallback_used_total",
            "Fetches served by the fallback source."
        );
        describe_counter!(
            "fetch_empty_total",
            "Fetch cycles that produced no headlines."
        );
        describe_counter!(
            "headlines_classified_total",
            "Headlines scored and persisted."
        );
        describe_counter!("batches_written_total", "Batch files written to the store.");
        describe_histogram!("fetch_duration_ms", "Source fetch+parse time in milliseconds.");
        describe_gauge!("fetch_last_run_ts", "Unix ts when a fetch cycle last ran.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Which source delivered a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Primary,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub records: Vec<HeadlineRecord>,
    pub source: SourceKind,
    /// User-visible, non-fatal.
    pub warning: Option<String>,
}

/// Primary source with a single fallback. No retries.
pub struct Fetcher {
    primary: Box<dyn HeadlineSource>,
    fallback: Box<dyn HeadlineSource>,
}

impl Fetcher {
    pub fn new(primary: Box<dyn HeadlineSource>, fallback: Box<dyn HeadlineSource>) -> Self {
        Self { primary, fallback }
    }

    /// NewsAPI primary, Google News fallback.
    pub fn from_config(cfg: &AppConfig) -> FetchResult<Self> {
        Ok(Self::new(
            Box::new(NewsApiProvider::from_config(cfg)?),
            Box::new(GoogleNewsProvider::from_config(cfg)),
        ))
    }

    pub async fn fetch_primary(&self, limit: usize) -> FetchResult<Vec<HeadlineRecord>> {
        self.primary.fetch_latest(limit).await
    }

    /// Truncated to `limit` whatever the source returned.
    pub async fn fetch_fallback(&self, limit: usize) -> FetchResult<Vec<HeadlineRecord>> {
        let mut out = self.fallback.fetch_latest(limit).await?;
        out.truncate(limit);
        Ok(out)
    }

    /// Primary first; any primary error switches to the fallback with a
    /// warning. Only a fallback error is returned to the caller.
    pub async fn fetch_with_fallback(&self, limit: usize) -> FetchResult<FetchOutcome> {
        ensure_metrics_described();

        match self.fetch_primary(limit).await {
            Ok(records) => Ok(FetchOutcome {
                records,
                source: SourceKind::Primary,
                warning: None,
            }),
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    error = %e,
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    "primary source failed, using fallback"
                );
                counter!("fetch_primary_errors_total").increment(1);
                counter!("fetch_fallback_used_total").increment(1);

                let records = self.fetch_fallback(limit).await.inspect_err(|e| {
                    tracing::error!(target: "ingest", error = %e, "fallback source failed");
                })?;
                Ok(FetchOutcome {
                    records,
                    source: SourceKind::Fallback,
                    warning: Some(FALLBACK_WARNING.to_string()),
                })
            }
        }
    }
}

/// Outcome of one fetch-classify cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub processed: usize,
    pub source: SourceKind,
    pub warnings: Vec<String>,
    pub batch_file: Option<PathBuf>,
}

impl FetchReport {
    pub fn used_fallback(&self) -> bool {
        self.source == SourceKind::Fallback
    }

    /// Message for the operator when something was written.
    pub fn success_message(&self) -> Option<String> {
        (self.processed > 0).then(|| format!("Processed {} headlines", self.processed))
    }
}

/// Errors of a fetch cycle: either no source delivered, or the store failed.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("news sources unavailable: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Fetch (with fallback), classify, persist. Empty fetches write nothing.
pub async fn run_fetch_cycle(
    fetcher: &Fetcher,
    classifier: &Classifier,
    limit: usize,
) -> std::result::Result<FetchReport, CycleError> {
    ensure_metrics_described();
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    gauge!("fetch_last_run_ts").set(now as f64);

    let outcome = fetcher.fetch_with_fallback(limit).await?;
    let mut warnings: Vec<String> = outcome.warning.into_iter().collect();
    let fetched = outcome.records.len();

    // Parquet encode + fsync stay off the async workers.
    let records = outcome.records;
    let classifier = classifier.clone();
    let batch = tokio::task::spawn_blocking(move || classifier.classify(records))
        .await
        .context("classify task failed")??;
    let (processed, batch_file) = match batch {
        Some(b) => (b.len(), Some(b.path)),
        None => {
            counter!("fetch_empty_total").increment(1);
            warnings.push(EMPTY_FETCH_WARNING.to_string());
            (0, None)
        }
    };

    tracing::info!(
        target: "ingest",
        fetched,
        processed,
        source = ?outcome.source,
        "fetch cycle finished"
    );

    Ok(FetchReport {
        processed,
        source: outcome.source,
        warnings,
        batch_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  Markets&nbsp;&nbsp; <b>rally</b>\n after “deal” ";
        assert_eq!(normalize_text(s), "Markets rally after \"deal\"");
    }

    #[test]
    fn normalize_text_keeps_comparisons() {
        assert_eq!(normalize_text("Rates < 5% for now"), "Rates < 5% for now");
    }

    #[test]
    fn report_messages() {
        let r = FetchReport {
            processed: 3,
            source: SourceKind::Fallback,
            warnings: vec![],
            batch_file: None,
        };
        assert!(r.used_fallback());
        assert_eq!(r.success_message().as_deref(), Some("Processed 3 headlines"));
    }
}
