//! Router construction, API handlers, and server startup.

use std::sync::Arc;

use {
    axum::{
        Router,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    chrono::{NaiveTime, Utc},
    serde::Deserialize,
    serde_json::json,
    tower_http::cors::{Any, CorsLayer},
    tracing::{error, info},
    uuid::Uuid,
};

use {
    chorus_pipeline::buffer,
    chorus_store::RunTrigger,
};

use crate::state::AppState;

/// Wraps dependency failures into a 5xx without leaking internals.
struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "API handler failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal server error" })),
        )
            .into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

/// Build the API router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/trigger", post(trigger_handler))
        .route("/api/channels", get(list_channels_handler))
        .route(
            "/api/channels/{channel_id}",
            post(add_channel_handler).delete(remove_channel_handler),
        )
        .route("/api/suggestions", get(list_suggestions_handler))
        .route("/api/suggestions/{id}", get(get_suggestion_handler))
        .route("/api/runs", get(list_runs_handler))
        .route("/api/debug", get(debug_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve the API until the process stops.
pub async fn start_server(state: AppState, bind: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API server listening");
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

fn today_start() -> chrono::DateTime<Utc> {
    Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc()
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "chorus" }))
}

async fn health_handler(State(state): State<AppState>) -> ApiResult {
    let channels = state.store.active_channels().await?;
    let today = state.store.suggestions_since(today_start()).await?;

    Ok(Json(json!({
        "status": "healthy",
        "listening_channels": channels.len(),
        "suggestions_today": today.len(),
        "max_daily_suggestions": state.config.max_suggestions_per_day,
    }))
    .into_response())
}

/// Enqueue a pipeline run; the run happens in the background.
async fn trigger_handler(State(state): State<AppState>) -> impl IntoResponse {
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        if let Err(e) = pipeline.run(RunTrigger::Manual).await {
            error!(error = %e, "manual pipeline run failed");
        }
    });

    Json(json!({ "status": "triggered", "message": "Pipeline run queued" }))
}

async fn list_channels_handler(State(state): State<AppState>) -> ApiResult {
    let channels = state.store.active_channels().await?;
    Ok(Json(json!({ "count": channels.len(), "channels": channels })).into_response())
}

async fn add_channel_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult {
    state.store.activate_channel(&channel_id, "api").await?;
    Ok(Json(json!({ "status": "added", "channel_id": channel_id })).into_response())
}

async fn remove_channel_handler(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult {
    let was_active = state.store.deactivate_channel(&channel_id).await?;
    Ok(Json(json!({
        "status": "removed",
        "channel_id": channel_id,
        "was_active": was_active,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct SuggestionsQuery {
    status: Option<String>,
    limit: Option<u32>,
}

async fn list_suggestions_handler(
    State(state): State<AppState>,
    Query(query): Query<SuggestionsQuery>,
) -> ApiResult {
    let suggestions = if query.status.as_deref() == Some("saved") {
        state
            .store
            .saved_suggestions(query.limit.unwrap_or(10))
            .await?
    } else {
        state.store.suggestions_since(today_start()).await?
    };

    Ok(Json(json!({ "count": suggestions.len(), "suggestions": suggestions })).into_response())
}

async fn get_suggestion_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid suggestion id" })),
        )
            .into_response());
    };

    match state.store.suggestion(id).await? {
        Some(suggestion) => Ok(Json(suggestion).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "suggestion not found" })),
        )
            .into_response()),
    }
}

async fn list_runs_handler(State(state): State<AppState>) -> ApiResult {
    let runs = state.store.recent_runs(20).await?;
    Ok(Json(json!({ "count": runs.len(), "runs": runs })).into_response())
}

/// Buffer status per monitored channel, for poking at a live instance.
async fn debug_handler(State(state): State<AppState>) -> ApiResult {
    let window = chrono::Duration::minutes(state.config.buffer_window_minutes);
    let channels = state.store.active_channels().await?;

    let mut channel_status = Vec::with_capacity(channels.len());
    for channel in &channels {
        let messages = state
            .store
            .messages_in_window(&channel.channel_id, window)
            .await?;
        let recent: Vec<_> = messages
            .iter()
            .rev()
            .take(5)
            .rev()
            .map(|m| {
                let preview: String = m.text.chars().take(50).collect();
                json!({ "author": author_suffix(&m.author_id), "text": preview })
            })
            .collect();

        channel_status.push(json!({
            "channel_id": channel.channel_id,
            "message_count": messages.len(),
            "min_required": state.config.min_messages_for_summary,
            "ready_to_summarize": buffer::readiness(
                messages.len(),
                state.config.min_messages_for_summary,
                false,
            )
            .is_ready(),
            "recent_messages": recent,
        }));
    }

    Ok(Json(json!({
        "listening_channels": channels.len(),
        "min_messages_for_summary": state.config.min_messages_for_summary,
        "buffer_window_minutes": state.config.buffer_window_minutes,
        "channels": channel_status,
    }))
    .into_response())
}

fn author_suffix(author_id: &str) -> &str {
    let len = author_id.len();
    if len <= 4 { author_id } else { &author_id[len - 4..] }
}
