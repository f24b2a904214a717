use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::analyze::{build_summarizer, DynSummarizer};
use crate::config::radar::RadarConfig;
use crate::history::{latest_scan, recent_history};
use crate::ingest::cache::{CachedSource, DynCacheStore, FileCacheStore};
use crate::ingest::providers::{reddit::RedditProvider, trends::TrendsProvider, youtube::YoutubeProvider};
use crate::ingest::types::SourcePayload;
use crate::notify::{DynAlertSink, NotifierMux};
use crate::scan::{DynSource, ScanPipeline};
use crate::store::{DynScanStore, JsonlScanStore};

#[derive(Clone)]
pub struct AppState {
    pub youtube: DynSource,
    pub reddit: DynSource,
    pub trends: DynSource,
    pub pipeline: Arc<ScanPipeline>,
    pub store: DynScanStore,
    pub summarizer: DynSummarizer,
}

impl AppState {
    /// Production wiring: cached connectors, JSON-lines store, env-configured
    /// alert channels and summarizer.
    pub fn from_config(cfg: &RadarConfig) -> anyhow::Result<Self> {
        let cache: DynCacheStore = Arc::new(FileCacheStore::new(&cfg.storage.cache_dir));
        let hours = chrono::Duration::hours;

        let youtube: DynSource = Arc::new(CachedSource::new(
            YoutubeProvider::from_env(cfg)?,
            cache.clone(),
            hours(cfg.youtube.cache_ttl_hours),
        ));
        let reddit: DynSource = Arc::new(CachedSource::new(
            RedditProvider::new(cfg)?,
            cache.clone(),
            hours(cfg.reddit.cache_ttl_hours),
        ));
        let trends: DynSource = Arc::new(CachedSource::new(
            TrendsProvider::new(cfg)?,
            cache,
            hours(cfg.trends.cache_ttl_hours),
        ));

        let store: DynScanStore = Arc::new(JsonlScanStore::new(
            &cfg.storage.scans_path,
            &cfg.storage.alerts_path,
        ));
        let alerts: DynAlertSink = Arc::new(NotifierMux::from_env().with_log(store.clone()));
        let summarizer = build_summarizer(&cfg.summarizer);
        tracing::info!(target: "scan", summarizer = summarizer.provider_name(), "radar wired");

        Ok(Self::new(youtube, reddit, trends, store, alerts, summarizer, cfg))
    }

    pub fn new(
        youtube: DynSource,
        reddit: DynSource,
        trends: DynSource,
        store: DynScanStore,
        alerts: DynAlertSink,
        summarizer: DynSummarizer,
        cfg: &RadarConfig,
    ) -> Self {
        let pipeline = ScanPipeline::new(
            vec![youtube.clone(), reddit.clone(), trends.clone()],
            summarizer.clone(),
            store.clone(),
            alerts,
        )
        .with_connector_timeout(std::time::Duration::from_secs(cfg.scan.connector_timeout_secs));
        Self {
            youtube,
            reddit,
            trends,
            pipeline: Arc::new(pipeline),
            store,
            summarizer,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/youtube", get(youtube))
        .route("/api/reddit", get(reddit))
        .route("/api/trends", get(trends))
        .route("/api/scan", get(scan).post(scan))
        .route("/api/latest-scan", get(latest))
        .route("/api/history", get(history))
        .route("/api/calendar", post(calendar))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// JSON error body with a status code.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

fn bad_gateway(e: impl std::fmt::Display) -> ApiError {
    ApiError(StatusCode::BAD_GATEWAY, e.to_string())
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn payload_json(p: SourcePayload) -> serde_json::Value {
    match p {
        SourcePayload::Videos(v) => json!({ "videos": v, "count": v.len() }),
        SourcePayload::Posts(p) => json!({ "posts": p, "count": p.len() }),
        SourcePayload::Trends(t) => json!({ "dailyTrends": t.daily_trends, "foodTrends": t.food_trends }),
    }
}

async fn youtube(State(s): State<AppState>) -> ApiResult {
    let p = s.youtube.fetch_latest().await.map_err(bad_gateway)?;
    Ok(Json(payload_json(p)))
}

async fn reddit(State(s): State<AppState>) -> ApiResult {
    let p = s.reddit.fetch_latest().await.map_err(bad_gateway)?;
    Ok(Json(payload_json(p)))
}

async fn trends(State(s): State<AppState>) -> ApiResult {
    let p = s.trends.fetch_latest().await.map_err(bad_gateway)?;
    Ok(Json(payload_json(p)))
}

async fn scan(State(s): State<AppState>) -> ApiResult {
    let out = s.pipeline.run().await.map_err(internal)?;
    Ok(Json(json!({ "report": out.report, "analysis": out.analysis })))
}

async fn latest(State(s): State<AppState>) -> ApiResult {
    let scan = latest_scan(s.store.as_ref()).await.map_err(internal)?;
    Ok(Json(json!({ "scan": scan })))
}

async fn history(State(s): State<AppState>) -> ApiResult {
    let view = recent_history(s.store.as_ref(), Utc::now())
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::to_value(view).map_err(internal)?))
}

async fn calendar(State(s): State<AppState>) -> ApiResult {
    let Some(scan) = latest_scan(s.store.as_ref()).await.map_err(internal)? else {
        return Err(ApiError(StatusCode::NOT_FOUND, "no scan with data yet".into()));
    };
    let bundle = crate::ingest::types::ScanBundle {
        videos: scan.videos,
        posts: scan.posts,
        trends: scan.trends,
    };
    match s.summarizer.calendar(scan.analysis.as_ref(), &bundle).await {
        Some(cal) => Ok(Json(json!({ "calendar": cal }))),
        None => Err(ApiError(
            StatusCode::SERVICE_UNAVAILABLE,
            "calendar generation unavailable".into(),
        )),
    }
}
