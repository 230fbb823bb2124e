// src/ingest/providers/newsapi.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{FetchError, FetchResult};
use crate::ingest::types::{HeadlineRecord, HeadlineSource};

#[derive(Debug, Deserialize)]
struct TopHeadlines {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

/// Primary source: NewsAPI `top-headlines`, bounded by a request timeout.
pub struct NewsApiProvider {
    http: reqwest::Client,
    url: String,
    api_key: String,
    language: String,
}

impl NewsApiProvider {
    pub fn new(url: &str, api_key: &str, language: &str, timeout: Duration) -> FetchResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("news-sentiment-dashboard/0.1")
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(Self {
            http,
            url: url.to_string(),
            api_key: api_key.to_string(),
            language: language.to_string(),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> FetchResult<Self> {
        Self::new(
            &cfg.newsapi_url,
            &cfg.api_key,
            &cfg.language,
            Duration::from_secs(cfg.primary_timeout_secs),
        )
    }

    fn parse_body(body: &[u8]) -> FetchResult<Vec<HeadlineRecord>> {
        let parsed: TopHeadlines =
            serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

        if parsed.status.as_deref() == Some("error") {
            return Err(FetchError::Api(
                parsed.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(parsed
            .articles
            .into_iter()
            .map(|a| {
                HeadlineRecord::new(
                    a.url,
                    a.source.and_then(|s| s.name),
                    a.title,
                    a.published_at,
                )
            })
            .collect())
    }
}

#[async_trait]
impl HeadlineSource for NewsApiProvider {
    async fn fetch_latest(&self, limit: usize) -> FetchResult<Vec<HeadlineRecord>> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::MissingApiKey("NewsAPI"));
        }

        let t0 = std::time::Instant::now();
        let page_size = limit.to_string();
        let resp = self
            .http
            .get(&self.url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("language", self.language.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.bytes().await?;
        let out = Self::parse_body(&body)?;

        histogram!("fetch_duration_ms", "source" => "newsapi")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("fetch_headlines_total", "source" => "newsapi").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "NewsAPI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_articles_and_missing_fields() {
        let body = br#"{
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {"source": {"id": null, "name": "Reuters"}, "title": "Markets rally",
                 "url": "https://r.example/1", "publishedAt": "2024-01-02T10:00:00Z"},
                {"source": null, "title": null, "url": null, "publishedAt": null}
            ]
        }"#;
        let out = NewsApiProvider::parse_body(body).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "https://r.example/1");
        assert_eq!(out[0].source.as_deref(), Some("Reuters"));
        assert_eq!(out[0].published_at.as_deref(), Some("2024-01-02T10:00:00Z"));
        assert_eq!(out[1].title, "");
        assert!(out[1].source.is_none());
    }

    #[test]
    fn error_status_in_body_is_api_error() {
        let body = br#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#;
        match NewsApiProvider::parse_body(body) {
            Err(FetchError::Api(m)) => assert!(m.contains("invalid")),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_key_fails_without_network() {
        let p = NewsApiProvider::new("http://127.0.0.1:9/", "", "en", Duration::from_secs(1))
            .unwrap();
        assert!(matches!(
            p.fetch_latest(5).await,
            Err(FetchError::MissingApiKey(_))
        ));
    }
}
