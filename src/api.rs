use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::classify::Classifier;
use crate::config::{clamp_refresh, AppConfig};
use crate::dashboard::{self, DashboardView, Notice, PageContext};
use crate::history::{self, RecentTable};
use crate::ingest::{self, CycleError, FetchReport, Fetcher};
use crate::sentiment::{LexiconScorer, PolarityScorer};
use crate::store::BatchStore;

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    store: Arc<BatchStore>,
    fetcher: Arc<Fetcher>,
    classifier: Arc<Classifier>,
    // one fetch-classify cycle at a time
    fetch_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        fetcher: Fetcher,
        scorer: Arc<dyn PolarityScorer>,
    ) -> anyhow::Result<Self> {
        let store = Arc::new(BatchStore::open(&config.storage_dir)?);
        let classifier = Arc::new(Classifier::new(scorer, store.clone()));
        Ok(Self {
            config: Arc::new(config),
            store,
            fetcher: Arc::new(fetcher),
            classifier,
            fetch_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Production wiring: NewsAPI + Google News, lexicon scorer.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let fetcher = Fetcher::from_config(&config)?;
        Self::new(config, fetcher, Arc::new(LexiconScorer::new()))
    }

    /// Run one fetch-classify cycle; concurrent callers queue.
    pub async fn run_fetch(&self) -> Result<FetchReport, CycleError> {
        let _guard = self.fetch_lock.lock().await;
        ingest::run_fetch_cycle(&self.fetcher, &self.classifier, self.config.page_size).await
    }

    /// Aggregate the newest batches on the blocking pool.
    pub async fn recent(&self, limit: usize) -> anyhow::Result<RecentTable> {
        let store = self.store.clone();
        let cap = self.config.recent_batch_cap;
        tokio::task::spawn_blocking(move || history::load_recent(&store, cap, limit))
            .await
            .context("history load task failed")?
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/fetch", post(fetch_form))
        .route("/api/fetch", post(fetch_json))
        .route("/api/recent", get(recent_json))
        .route("/api/view", get(view_json))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Same router, named like the library re-export.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    refresh: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = ?e, "store error");
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
    }
}

impl From<CycleError> for ApiError {
    fn from(e: CycleError) -> Self {
        match e {
            CycleError::Fetch(f) => ApiError(StatusCode::BAD_GATEWAY, f.to_string()),
            CycleError::Store(s) => s.into(),
        }
    }
}

fn refresh_for(state: &AppState, q: &PageQuery) -> u64 {
    clamp_refresh(q.refresh.unwrap_or(state.config.refresh_interval_secs))
}

/// Read path: aggregate + present. Load failures still render the page.
async fn render_dashboard(
    state: &AppState,
    refresh_secs: u64,
    mut notices: Vec<Notice>,
) -> Response {
    let (status, table) = match state.recent(state.config.recent_rows).await {
        Ok(t) => (StatusCode::OK, t),
        Err(e) => {
            tracing::error!(error = ?e, "loading recent history failed");
            notices.push(Notice::error(format!("Could not load history: {e:#}")));
            (StatusCode::INTERNAL_SERVER_ERROR, RecentTable::default())
        }
    };
    let view = dashboard::present(&table);
    let ctx = PageContext {
        refresh_secs,
        last_updated: Utc::now(),
        notices,
    };
    (status, Html(dashboard::render_page(&view, &ctx))).into_response()
}

async fn index(State(state): State<AppState>, Query(q): Query<PageQuery>) -> Response {
    let refresh = refresh_for(&state, &q);
    render_dashboard(&state, refresh, Vec::new()).await
}

async fn fetch_form(State(state): State<AppState>, Query(q): Query<PageQuery>) -> Response {
    let refresh = refresh_for(&state, &q);
    let notices = match state.run_fetch().await {
        Ok(report) => {
            let mut n: Vec<Notice> = report.warnings.iter().map(Notice::warning).collect();
            if let Some(msg) = report.success_message() {
                n.push(Notice::success(msg));
            }
            n
        }
        Err(e) => {
            tracing::error!(error = %e, "fetch cycle failed");
            vec![Notice::error(format!("Fetch failed: {e}"))]
        }
    };
    render_dashboard(&state, refresh, notices).await
}

async fn fetch_json(State(state): State<AppState>) -> Result<Json<FetchReport>, ApiError> {
    Ok(Json(state.run_fetch().await?))
}

async fn recent_json(
    State(state): State<AppState>,
    Query(q): Query<RecentQuery>,
) -> Result<Json<RecentTable>, ApiError> {
    let limit = q.limit.unwrap_or(state.config.recent_rows).max(1);
    Ok(Json(state.recent(limit).await?))
}

async fn view_json(State(state): State<AppState>) -> Result<Json<DashboardView>, ApiError> {
    let table = state.recent(state.config.recent_rows).await?;
    Ok(Json(dashboard::present(&table)))
}
