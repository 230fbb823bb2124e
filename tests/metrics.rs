// tests/metrics.rs
// One recorder per process, so the whole flow lives in a single test.
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use news_sentiment_dashboard::error::{FetchError, FetchResult};
use news_sentiment_dashboard::ingest::providers::GoogleNewsProvider;
use news_sentiment_dashboard::ingest::types::{HeadlineRecord, HeadlineSource};
use news_sentiment_dashboard::ingest::Fetcher;
use news_sentiment_dashboard::metrics::Metrics;
use news_sentiment_dashboard::sentiment::LexiconScorer;
use news_sentiment_dashboard::{api, AppConfig, AppState};

struct UnreachableSource;

#[async_trait]
impl HeadlineSource for UnreachableSource {
    async fn fetch_latest(&self, _limit: usize) -> FetchResult<Vec<HeadlineRecord>> {
        Err(FetchError::Http("connection refused".into()))
    }
    fn name(&self) -> &'static str {
        "unreachable"
    }
}

#[tokio::test]
async fn fallback_cycle_shows_up_on_metrics_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        storage_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };

    let metrics = Metrics::init(&config).expect("recorder");

    let xml = std::fs::read_to_string("tests/fixtures/google_news_rss.xml").expect("fixture");
    let fetcher = Fetcher::new(
        Box::new(UnreachableSource),
        Box::new(GoogleNewsProvider::from_fixture_str(&xml)),
    );
    let state = AppState::new(config, fetcher, Arc::new(LexiconScorer::new())).unwrap();
    let app = api::create_router(state).merge(metrics.router());

    let r = app
        .clone()
        .oneshot(Request::post("/api/fetch").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(r.status(), StatusCode::OK);

    let m = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(m.status(), StatusCode::OK);
    let body = body::to_bytes(m.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "fetch_primary_errors_total",
        "fetch_fallback_used_total",
        "fetch_headlines_total",
        "headlines_classified_total",
        "batches_written_total",
        "fetch_duration_ms",
        "fetch_last_run_ts",
        "config_page_size",
        "config_recent_batch_cap",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }

    // Same handle, same numbers.
    let rendered = metrics.handle.render();
    assert!(rendered.contains("headlines_classified_total 3"));
    assert!(rendered.contains("batches_written_total 1"));
}
