// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::FetchResult;

/// One raw headline as delivered by a source. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadlineRecord {
    pub id: String,                   // article URL, or a generated UUID
    pub source: Option<String>,       // e.g., "Reuters", "BBC News"
    pub title: String,                // normalized title, may be empty
    pub published_at: Option<String>, // raw provider timestamp, parsed on read
}

impl HeadlineRecord {
    /// Build a record, deriving the id from the URL or a fresh UUID.
    pub fn new(
        url: Option<String>,
        source: Option<String>,
        title: Option<String>,
        published_at: Option<String>,
    ) -> Self {
        let id = url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            id,
            source: source.filter(|s| !s.trim().is_empty()),
            title: title
                .map(|t| crate::ingest::normalize_text(&t))
                .unwrap_or_default(),
            published_at: published_at.filter(|p| !p.trim().is_empty()),
        }
    }
}

#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Fetch up to `limit` headlines.
    async fn fetch_latest(&self, limit: usize) -> FetchResult<Vec<HeadlineRecord>>;
    fn name(&self) -> &'static str;
}
