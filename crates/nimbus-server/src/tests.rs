use crate::event::SseEvent;
use crate::state::{AppState, JobSpawner};
use crate::router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use nimbus_store::{FsLogArchive, JobStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

struct StubSpawner;

impl JobSpawner for StubSpawner {
    fn spawn(&self, _prompt: String, _model: Option<String>) -> mpsc::UnboundedReceiver<SseEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(SseEvent::JobCreated { job_id: "job_test0001".to_string() });
        rx
    }
}

async fn test_state() -> AppState {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("../nimbus-store/migrations").run(&pool).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    AppState {
        store: JobStore::new(pool),
        archive: Arc::new(FsLogArchive::new(dir.path())),
        spawner: Arc::new(StubSpawner),
        auth_token: Arc::new("secret-token".to_string()),
    }
}

#[tokio::test]
async fn health_returns_ok() {
    let app = router(test_state().await);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_job_with_empty_prompt_is_bad_request() {
    let app = router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/jobs")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt":""}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logs_without_auth_header_is_unauthorized() {
    let app = router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs/job_missing/logs?type=build")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logs_with_wrong_auth_header_is_unauthorized() {
    let app = router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs/job_missing/logs?type=build")
                .header("Auth", "wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logs_for_absent_job_with_correct_token_is_not_found() {
    let app = router(test_state().await);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs/job_missing/logs?type=build")
                .header("Auth", "secret-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = router(test_state().await);
    let response = app
        .oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
