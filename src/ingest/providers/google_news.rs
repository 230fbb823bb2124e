// src/ingest/providers/google_news.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::error::{FetchError, FetchResult};
use crate::ingest::types::{HeadlineRecord, HeadlineSource};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text", default)]
    name: Option<String>,
}

/// Fallback source: Google News top stories RSS for a language/country pair.
/// The feed has no page-size parameter, so results are truncated after parsing.
pub struct GoogleNewsProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// Top-stories feed URL, e.g. `hl=en-US&gl=US&ceid=US:en`.
pub fn top_stories_url(base: &str, language: &str, country: &str) -> String {
    let lang = language.to_ascii_lowercase();
    let cc = country.to_ascii_uppercase();
    format!("{base}?hl={lang}-{cc}&gl={cc}&ceid={cc}:{lang}")
}

impl GoogleNewsProvider {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
            },
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::from_url(top_stories_url(&cfg.fallback_url, &cfg.language, &cfg.country))
    }

    fn parse_items_from_str(s: &str, limit: usize) -> FetchResult<Vec<HeadlineRecord>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Decode(e.to_string()))?;

        let out: Vec<HeadlineRecord> = rss
            .channel
            .item
            .into_iter()
            .take(limit)
            .map(|it| {
                let source = it.source.and_then(|s| s.name).map(|s| s.trim().to_string());
                let title = it
                    .title
                    .map(|t| strip_source_suffix(&t, source.as_deref()));
                HeadlineRecord::new(it.link, source, title, it.pub_date)
            })
            .collect();

        histogram!("fetch_duration_ms", "source" => "google_news")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("fetch_headlines_total", "source" => "google_news").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl HeadlineSource for GoogleNewsProvider {
    async fn fetch_latest(&self, limit: usize) -> FetchResult<Vec<HeadlineRecord>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s, limit),
            Mode::Http { url, client } => {
                let resp = client.get(url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status.as_u16()));
                }
                let body = resp.text().await?;
                Self::parse_items_from_str(&body, limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        "Google News"
    }
}

/// Google News titles look like `"Headline - Publisher"`; drop the suffix
/// when it repeats the item's source.
fn strip_source_suffix(title: &str, source: Option<&str>) -> String {
    let t = title.trim();
    match source {
        Some(src) if !src.is_empty() => t
            .strip_suffix(src)
            .and_then(|rest| rest.trim_end().strip_suffix('-'))
            .map(|rest| rest.trim_end().to_string())
            .unwrap_or_else(|| t.to_string()),
        _ => t.to_string(),
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
