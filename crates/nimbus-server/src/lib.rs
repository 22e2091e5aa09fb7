//! The HTTP surface (spec §4.8, §6, C8): routing, SSE framing, CORS,
//! and the admin bearer-token gate for log retrieval.

mod dto;
mod error;
mod event;
mod handlers;
mod state;
#[cfg(test)]
mod tests;

pub use dto::{CreateJobBody, JobDto, JobListItemDto, JobsResponse};
pub use error::ServerError;
pub use event::{CompletionMetricsView, SseEvent};
pub use state::{AppState, JobSpawner};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the full router against the given state. Grounded on the
/// `adk-studio` pack example's `State<AppState>` extractor pattern,
/// with routes laid out per the route table.
#[must_use]
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::HeaderName::from_static("auth")]);

    Router::new()
        .route("/api/jobs", post(handlers::create_job).get(handlers::list_jobs))
        .route("/api/jobs/:id", get(handlers::get_job))
        .route("/api/jobs/:id/logs", get(handlers::get_job_logs))
        .route("/build", post(handlers::create_job))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
