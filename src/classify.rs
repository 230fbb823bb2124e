//! Scores headline batches and persists each scored batch.

use anyhow::Result;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::ingest::types::HeadlineRecord;
use crate::sentiment::PolarityScorer;
use crate::store::BatchStore;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    /// Binary label: only strictly positive polarity is Positive.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > 0.0 {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Positive" => Ok(Sentiment::Positive),
            "Negative" => Ok(Sentiment::Negative),
            other => Err(anyhow::anyhow!("unknown sentiment label '{other}'")),
        }
    }
}

/// A headline plus its label and clamped positive score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredRecord {
    pub id: String,
    pub source: Option<String>,
    pub title: String,
    pub published_at: Option<String>,
    pub sentiment: Sentiment,
    /// `max(polarity, 0)`; not a probability.
    pub prob_pos: f64,
}

impl ScoredRecord {
    pub fn from_headline(h: HeadlineRecord, polarity: f64) -> Self {
        let polarity = if polarity.is_finite() {
            polarity.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        Self {
            id: h.id,
            source: h.source,
            title: h.title,
            published_at: h.published_at,
            sentiment: Sentiment::from_polarity(polarity),
            prob_pos: polarity.max(0.0),
        }
    }
}

/// Result of one classify call: the written batch file and its rows.
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub path: PathBuf,
    pub records: Vec<ScoredRecord>,
}

impl ScoredBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Clone)]
pub struct Classifier {
    scorer: Arc<dyn PolarityScorer>,
    store: Arc<BatchStore>,
}

impl Classifier {
    pub fn new(scorer: Arc<dyn PolarityScorer>, store: Arc<BatchStore>) -> Self {
        Self { scorer, store }
    }

    /// Score every title without touching the store.
    pub fn score_all(&self, records: Vec<HeadlineRecord>) -> Vec<ScoredRecord> {
        records
            .into_iter()
            .map(|h| {
                let p = self.scorer.polarity(&h.title);
                ScoredRecord::from_headline(h, p)
            })
            .collect()
    }

    /// Score and persist one batch. `Ok(None)` means there was no input and
    /// nothing was written.
    pub fn classify(&self, records: Vec<HeadlineRecord>) -> Result<Option<ScoredBatch>> {
        if records.is_empty() {
            return Ok(None);
        }

        let scored = self.score_all(records);
        let path = self.store.write_batch(&scored)?;

        let positives = scored
            .iter()
            .filter(|r| r.sentiment == Sentiment::Positive)
            .count();
        counter!("headlines_classified_total").increment(scored.len() as u64);
        tracing::info!(
            target: "ingest",
            rows = scored.len(),
            positives,
            file = %path.display(),
            "batch classified"
        );

        Ok(Some(ScoredBatch {
            path,
            records: scored,
        }))
    }
}
