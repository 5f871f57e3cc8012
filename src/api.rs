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

use crate::error::FetchError;
use crate::feed::{FeedDocument, HealthReport};
use crate::sync::{FeedSync, HeadStatus, PollReport, PollRequest};

#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<FeedSync>,
}

impl AppState {
    pub fn new(sync: FeedSync) -> Self {
        Self {
            sync: Arc::new(sync),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/tools/check-head", get(check_head))
        .route("/tools/poll", post(poll))
        .route("/tools/sources", get(list_sources))
        .route("/tools/feed-health", get(feed_health))
        .route("/resources/latest", get(latest))
        .route("/debug/cursors", get(debug_cursors))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Upstream failures surface as 502 (504 on timeout).
pub struct ApiError(FetchError);

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };
        let body = serde_json::json!({ "error": self.0.to_string(), "kind": self.0.kind() });
        (status, Json(body)).into_response()
    }
}

#[derive(Deserialize)]
struct SourceQuery {
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct TagQuery {
    #[serde(default)]
    tag: Option<String>,
}

#[derive(Serialize)]
struct TextOut {
    text: String,
}

async fn check_head(
    State(state): State<AppState>,
    Query(q): Query<SourceQuery>,
) -> Result<Json<HeadStatus>, ApiError> {
    Ok(Json(state.sync.check_head(q.source.as_deref()).await?))
}

async fn poll(
    State(state): State<AppState>,
    Json(req): Json<PollRequest>,
) -> Result<Json<PollReport>, ApiError> {
    Ok(Json(state.sync.poll(&req).await?))
}

async fn list_sources(
    State(state): State<AppState>,
    Query(q): Query<TagQuery>,
) -> Result<Json<TextOut>, ApiError> {
    let text = state.sync.list_sources(q.tag.as_deref()).await?;
    Ok(Json(TextOut { text }))
}

async fn feed_health(State(state): State<AppState>) -> Result<Json<HealthReport>, ApiError> {
    Ok(Json(state.sync.health().await?))
}

async fn latest(
    State(state): State<AppState>,
    Query(q): Query<SourceQuery>,
) -> Result<Json<FeedDocument>, ApiError> {
    Ok(Json(state.sync.latest_document(q.source.as_deref()).await?))
}

#[derive(Serialize)]
struct CursorOut {
    feed_key: String,
    cursor: String,
}

async fn debug_cursors(State(state): State<AppState>) -> Json<Vec<CursorOut>> {
    let out = state
        .sync
        .cursors()
        .into_iter()
        .map(|(k, c)| CursorOut {
            feed_key: k.to_string(),
            cursor: c.to_string(),
        })
        .collect();
    Json(out)
}
