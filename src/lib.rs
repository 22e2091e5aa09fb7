//! Nimbus: a build-and-deploy orchestrator that turns a prompt into a
//! deployed edge worker. This crate wires the framework registry (C4),
//! LLM client (C3), sandbox driver (C5), deploy driver (C6), job store
//! (C1/C2), and HTTP surface (C8) into the job pipeline (C7) and
//! cleanup sweeper (C9) described in the module breakdown.

pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod sweeper;

pub use error::NimbusError;
pub use pipeline::JobPipeline;
pub use sweeper::Sweeper;

use nimbus_config::Config;
use nimbus_deploy::{CloudflareEdgeWorkerApi, EdgeWorkerApi};
use nimbus_llm::{HttpClient, LlmBackend, OpenRouterBackend};
use nimbus_sandbox::{LocalSandboxProvisioner, RemoteSandboxProvisioner, SandboxProvisioner};
use nimbus_server::AppState;
use nimbus_store::{FsLogArchive, JobStore, LogArchive};
use std::sync::Arc;

/// Everything [`crate::bootstrap`] assembles, handed back so `main.rs`
/// can build the router and spawn the sweeper from the same pieces.
pub struct Orchestrator {
    pub state: AppState,
    pub pipeline: JobPipeline,
    pub sweeper: Sweeper,
}

/// Construct every collaborator from `config` and wire them into the
/// job pipeline, HTTP application state, and cleanup sweeper.
///
/// # Errors
/// Returns `NimbusError` if the job store cannot connect/migrate or the
/// LLM backend cannot be constructed.
pub async fn bootstrap(config: Config) -> Result<Orchestrator, NimbusError> {
    let config = Arc::new(config);

    let store = JobStore::connect(&config.database_url).await?;
    let archive: Arc<dyn LogArchive> = Arc::new(FsLogArchive::new(&config.log_archive_dir));
    let llm: Arc<dyn LlmBackend> = Arc::new(OpenRouterBackend::new(
        HttpClient::new()?,
        config.openrouter_api_key.clone(),
        config.default_model.clone(),
    ));
    let edge_workers: Arc<dyn EdgeWorkerApi> = Arc::new(CloudflareEdgeWorkerApi::new(
        config.cloudflare_account_id.clone(),
        config.cloudflare_api_token.clone(),
    ));

    let sandboxes: Arc<dyn SandboxProvisioner> = match &config.sandbox_api_url {
        Some(url) => Arc::new(RemoteSandboxProvisioner::new(url.clone())),
        None => Arc::new(LocalSandboxProvisioner),
    };

    let pipeline = JobPipeline::new(
        Arc::clone(&config),
        store.clone(),
        Arc::clone(&archive),
        llm,
        sandboxes,
    );

    let state = AppState {
        store: store.clone(),
        archive: Arc::clone(&archive),
        spawner: Arc::new(pipeline.clone()),
        auth_token: Arc::new(config.auth_token.clone()),
    };

    let sweeper = Sweeper::new(store, archive, edge_workers, config.sweep_interval);

    Ok(Orchestrator {
        state,
        pipeline,
        sweeper,
    })
}
