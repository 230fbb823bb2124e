//! News Sentiment Dashboard: binary entrypoint.
//! Boots the Axum HTTP server: dashboard page, manual fetch trigger, JSON
//! views and `/metrics`.

use news_sentiment_dashboard::{api, metrics::Metrics, AppConfig, AppState};
use shuttle_axum::ShuttleAxum;
use tracing::info;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables NEWSAPI_KEY / PRED_DIR / NEWS_SENTIMENT_CONFIG from .env.
    let _ = dotenvy::dotenv();

    news_sentiment_dashboard::init_tracing();

    let config = AppConfig::load_default()?;
    info!(
        storage_dir = %config.storage_dir.display(),
        page_size = config.page_size,
        recent_batch_cap = config.recent_batch_cap,
        key_len = config.api_key.len(),
        "config loaded"
    );

    let metrics = Metrics::init(&config)?;
    let state = AppState::from_config(config)?;
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
