// src/api.rs
//! HTTP entry points over the orchestrator: sync, feed test, logs.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::sync::event_log::SyncEvent;
use crate::sync::registry::SourceDescriptor;
use crate::sync::{
    FeedProbe, SourceOutcome, SourceTally, SyncOrchestrator, SyncOutcome, SyncTotals,
};

const DEFAULT_LOG_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/feeds", get(list_feeds))
        .route("/feeds/test", get(test_feeds))
        .route("/sync", post(sync_all))
        .route("/sync/source", post(sync_source))
        .route("/logs", get(get_logs).delete(clear_logs))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SyncSourceReq {
    feed_url: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: msg.into() })).into_response()
}

async fn list_feeds(State(state): State<AppState>) -> Json<Vec<SourceDescriptor>> {
    Json(state.orchestrator.registry().sources().to_vec())
}

async fn test_feeds(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<FeedProbe>> {
    Json(state.orchestrator.test_feeds(q.limit).await)
}

async fn sync_all(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Response {
    match state.orchestrator.sync_all_with_cap(q.limit).await {
        Ok(SyncOutcome::Completed(totals)) => Json::<SyncTotals>(totals).into_response(),
        Ok(SyncOutcome::AlreadyRunning) => error(StatusCode::CONFLICT, "sync already in progress"),
        Err(e) => error(StatusCode::BAD_GATEWAY, format!("{e:#}")),
    }
}

async fn sync_source(State(state): State<AppState>, Json(body): Json<SyncSourceReq>) -> Response {
    let Some(source) = state.orchestrator.registry().find(&body.feed_url).cloned() else {
        return error(StatusCode::NOT_FOUND, format!("unknown feed: {}", body.feed_url));
    };
    match state.orchestrator.sync_source(&source, body.limit).await {
        Ok(SourceOutcome::Completed(tally)) => Json::<SourceTally>(tally).into_response(),
        Ok(SourceOutcome::AlreadyRunning) => {
            error(StatusCode::CONFLICT, "sync already in progress")
        }
        Err(e) => error(StatusCode::BAD_GATEWAY, format!("{e:#}")),
    }
}

async fn get_logs(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<SyncEvent>> {
    Json(state.orchestrator.logs(q.limit.unwrap_or(DEFAULT_LOG_LIMIT)))
}

async fn clear_logs(State(state): State<AppState>) -> Json<Vec<SyncEvent>> {
    state.orchestrator.clear_logs();
    Json(state.orchestrator.logs(DEFAULT_LOG_LIMIT))
}
