//! Route handlers (spec §6 route table).

use crate::dto::{CreateJobBody, JobDto, JobListItemDto, JobsResponse};
use crate::error::ServerError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

const DEFAULT_LIST_LIMIT: i64 = 50;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// `POST /api/jobs` and its legacy alias `POST /build` (spec §6).
pub async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    if body.prompt.trim().is_empty() {
        return Err(ServerError::BadRequest("prompt must be a non-empty string".to_string()));
    }

    let receiver = state.spawner.spawn(body.prompt, body.model);
    let stream = UnboundedReceiverStream::new(receiver).map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| {
            serde_json::json!({"type": "error", "message": "failed to serialize event"}).to_string()
        });
        Ok(Event::default().data(payload))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<JobsResponse>, ServerError> {
    let jobs = state.store.list_jobs(DEFAULT_LIST_LIMIT).await?;
    Ok(Json(JobsResponse { jobs: jobs.into_iter().map(JobListItemDto::from).collect() }))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDto>, ServerError> {
    let job = state.store.get_job(&id).await?.ok_or(ServerError::NotFound)?;
    Ok(Json(JobDto::from(job)))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(rename = "type")]
    pub log_type: String,
}

/// `GET /api/jobs/{id}/logs?type=build|deploy`, gated by the admin
/// bearer token (spec §4.8, §8 boundary behaviors).
pub async fn get_job_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
    headers: axum::http::HeaderMap,
) -> Result<String, ServerError> {
    let provided = headers.get("Auth").and_then(|v| v.to_str().ok());
    if provided != Some(state.auth_token.as_str()) {
        return Err(ServerError::Unauthorized);
    }

    let keys = state.store.get_job_log_keys(&id).await?.ok_or(ServerError::NotFound)?;
    let key = match query.log_type.as_str() {
        "build" => keys.0,
        "deploy" => keys.1,
        _ => return Err(ServerError::BadRequest("type must be 'build' or 'deploy'".to_string())),
    }
    .ok_or(ServerError::NotFound)?;

    state
        .archive
        .get(&key)
        .await?
        .ok_or(ServerError::NotFound)
}

pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
