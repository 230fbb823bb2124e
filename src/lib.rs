// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod sentiment;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::classify::{Classifier, ScoredRecord, Sentiment};
pub use crate::config::AppConfig;
pub use crate::error::FetchError;
pub use crate::history::{load_recent, RecentTable};
pub use crate::ingest::{run_fetch_cycle, FetchReport, Fetcher};
pub use crate::store::BatchStore;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing for the binaries. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("news_sentiment_dashboard=info,ingest=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
