// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const ENV_CONFIG_PATH: &str = "NEWS_SENTIMENT_CONFIG";
pub const ENV_API_KEY: &str = "NEWSAPI_KEY";
pub const ENV_STORAGE_DIR: &str = "PRED_DIR";
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

pub const REFRESH_MIN_SECS: u64 = 10;
pub const REFRESH_MAX_SECS: u64 = 120;
pub const DEFAULT_REFRESH_SECS: u64 = 30;

fn default_storage_dir() -> PathBuf {
    PathBuf::from("predictions_parquet")
}
fn default_page_size() -> usize {
    20
}
fn default_recent_batch_cap() -> usize {
    50
}
fn default_recent_rows() -> usize {
    crate::history::DEFAULT_RECENT_ROWS
}
fn default_language() -> String {
    "en".to_string()
}
fn default_country() -> String {
    "US".to_string()
}
fn default_primary_timeout_secs() -> u64 {
    10
}
fn default_newsapi_url() -> String {
    "https://newsapi.org/v2/top-headlines".to_string()
}
fn default_fallback_url() -> String {
    "https://news.google.com/rss".to_string()
}
fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

/// Explicit configuration handed to the fetcher, classifier and store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// NewsAPI key. "ENV" means: read from NEWSAPI_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Headlines requested per fetch (NewsAPI caps this at 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// How many of the newest batch files the dashboard reads.
    #[serde(default = "default_recent_batch_cap")]
    pub recent_batch_cap: usize,
    /// Rows kept in the aggregated view.
    #[serde(default = "default_recent_rows")]
    pub recent_rows: usize,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_primary_timeout_secs")]
    pub primary_timeout_secs: u64,
    #[serde(default = "default_newsapi_url")]
    pub newsapi_url: String,
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,
    /// Advisory page reload interval; never triggers a fetch.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            storage_dir: default_storage_dir(),
            page_size: default_page_size(),
            recent_batch_cap: default_recent_batch_cap(),
            recent_rows: default_recent_rows(),
            language: default_language(),
            country: default_country(),
            primary_timeout_secs: default_primary_timeout_secs(),
            newsapi_url: default_newsapi_url(),
            fallback_url: default_fallback_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let cfg: AppConfig = if ext == "json" {
            serde_json::from_str(&data)
                .with_context(|| format!("parsing json config {}", path.display()))?
        } else {
            toml::from_str(&data)
                .with_context(|| format!("parsing toml config {}", path.display()))?
        };
        Ok(cfg.finish())
    }

    /// Load using env var + fallbacks:
    /// 1) $NEWS_SENTIMENT_CONFIG
    /// 2) config/app.toml
    /// 3) built-in defaults
    ///
    /// Then NEWSAPI_KEY / PRED_DIR override the file values.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default().finish()
        };
        Ok(base.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = env::var(ENV_API_KEY) {
            if !key.trim().is_empty() {
                self.api_key = key.trim().to_string();
            }
        }
        if let Ok(dir) = env::var(ENV_STORAGE_DIR) {
            if !dir.trim().is_empty() {
                self.storage_dir = PathBuf::from(dir.trim());
            }
        }
        self
    }

    /// Resolve "ENV" placeholders and sanitize ranges.
    fn finish(mut self) -> Self {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            // Missing key is not fatal: the primary source fails fast and the
            // fallback source takes over.
            self.api_key = env::var(ENV_API_KEY).unwrap_or_else(|_| {
                tracing::warn!("api_key = \"ENV\" but {ENV_API_KEY} is not set");
                String::new()
            });
        }
        self.api_key = self.api_key.trim().to_string();

        self.page_size = self.page_size.clamp(1, 100);
        self.recent_batch_cap = self.recent_batch_cap.max(1);
        self.recent_rows = self.recent_rows.max(1);
        self.primary_timeout_secs = self.primary_timeout_secs.max(1);
        self.refresh_interval_secs = clamp_refresh(self.refresh_interval_secs);

        if self.language.trim().is_empty() {
            self.language = default_language();
        }
        if self.country.trim().is_empty() {
            self.country = default_country();
        }
        self
    }
}

/// Refresh interval control range (seconds).
pub fn clamp_refresh(secs: u64) -> u64 {
    secs.clamp(REFRESH_MIN_SECS, REFRESH_MAX_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_controls() {
        let c = AppConfig::default();
        assert_eq!(c.page_size, 20);
        assert_eq!(c.recent_batch_cap, 50);
        assert_eq!(c.recent_rows, 200);
        assert_eq!(c.refresh_interval_secs, 30);
        assert_eq!(c.primary_timeout_secs, 10);
    }

    #[test]
    fn ranges_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("app.toml");
        fs::write(
            &p,
            r#"
api_key = " abc "
page_size = 500
recent_batch_cap = 0
refresh_interval_secs = 3
language = ""
"#,
        )
        .unwrap();
        let c = AppConfig::load_from_file(&p).unwrap();
        assert_eq!(c.api_key, "abc");
        assert_eq!(c.page_size, 100);
        assert_eq!(c.recent_batch_cap, 1);
        assert_eq!(c.refresh_interval_secs, 10);
        assert_eq!(c.language, "en");
    }

    #[test]
    fn refresh_clamp_bounds() {
        assert_eq!(clamp_refresh(0), 10);
        assert_eq!(clamp_refresh(45), 45);
        assert_eq!(clamp_refresh(600), 120);
    }
}
