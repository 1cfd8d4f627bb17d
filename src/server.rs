//! HTTP surface: aggregation and summary endpoints over axum.

use crate::chat::ChatClient;
use crate::config::Config;
use crate::fixtures;
use crate::models::LanguageRecord;
use crate::pipeline::Aggregator;
use crate::summarize::{summarize_comments, SummaryScope};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub chat: ChatClient,
    pub config: Arc<Config>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub items: Vec<LanguageRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub query: String,
    #[serde(default)]
    pub items: Vec<LanguageRecord>,
    #[serde(default)]
    pub scope: Option<SummaryScope>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    pub error: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/video", post(analyze_video))
        .route("/api/summary/comments", post(summarize))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

fn required_query(query: &str) -> Result<String, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }
    Ok(query.to_string())
}

async fn analyze_video(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let query = required_query(&request.query)?;

    let items = if state.config.force_local_comments {
        fixtures::load_records(Path::new(&state.config.mock_data_path)).map_err(|e| {
            error!("Fixture mode failed: {:#}", e);
            ApiError::internal("fixture data unavailable")
        })?
    } else {
        state.aggregator.aggregate(&query).await
    };

    Ok(Json(QueryResponse { query, items }))
}

async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let query = required_query(&request.query)?;
    let summary = summarize_comments(
        &state.chat,
        &query,
        &request.items,
        request.scope,
        &state.config.output_language,
    )
    .await;
    Ok(Json(SummaryResponse { summary }))
}
