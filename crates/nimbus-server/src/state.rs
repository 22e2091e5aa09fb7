//! Shared application state injected into every handler (spec §4.8).

use crate::event::SseEvent;
use nimbus_store::{JobStore, LogArchive};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Starts the job pipeline for one request and returns the channel the
/// HTTP surface streams as SSE. Implemented by the root orchestration
/// crate; this crate only depends on the trait, never on the pipeline
/// itself, to keep the dependency graph acyclic.
pub trait JobSpawner: Send + Sync {
    fn spawn(&self, prompt: String, model: Option<String>) -> mpsc::UnboundedReceiver<SseEvent>;
}

#[derive(Clone)]
pub struct AppState {
    pub store: JobStore,
    pub archive: Arc<dyn LogArchive>,
    pub spawner: Arc<dyn JobSpawner>,
    pub auth_token: Arc<String>,
}
