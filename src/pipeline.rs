//! The job pipeline (spec §4.1, C7): the single forward sequence per
//! job that ties the LLM client, framework registry, sandbox driver,
//! deploy driver, and job store together and emits the SSE event
//! taxonomy the HTTP surface streams back to the client.

use chrono::Duration as ChronoDuration;
use nimbus_config::Config;
use nimbus_deploy::deploy;
use nimbus_llm::LlmBackend;
use nimbus_registry::{normalize, resolve_framework, resolve_target, NimbusConfig};
use nimbus_sandbox::{run_build, Sandbox, SandboxEvent, SandboxProvisioner};
use nimbus_server::{CompletionMetricsView, JobSpawner, SseEvent};
use nimbus_store::{build_log_key, deploy_log_key, CompletionMetrics, JobStore, LogArchive, TerminalExtras};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::warn;

use crate::prompt;

/// Orchestrates one job end to end. Cheap to clone: every field is
/// either an `Arc` or (for `JobStore`) a pooled connection handle, so a
/// fresh clone can be moved into each job's `tokio::spawn`ed task.
#[derive(Clone)]
pub struct JobPipeline {
    config: Arc<Config>,
    store: JobStore,
    archive: Arc<dyn LogArchive>,
    llm: Arc<dyn LlmBackend>,
    sandboxes: Arc<dyn SandboxProvisioner>,
}

impl JobPipeline {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        store: JobStore,
        archive: Arc<dyn LogArchive>,
        llm: Arc<dyn LlmBackend>,
        sandboxes: Arc<dyn SandboxProvisioner>,
    ) -> Self {
        Self {
            config,
            store,
            archive,
            llm,
            sandboxes,
        }
    }

    async fn run(&self, prompt_text: String, model: Option<String>, tx: mpsc::UnboundedSender<SseEvent>) {
        let model = model.unwrap_or_else(|| self.config.default_model.clone());
        let id = nimbus_utils::job_id();

        if let Err(e) = self.store.create_job(&id, &prompt_text, &model).await {
            warn!(error = %e, "failed to create job row");
            let _ = tx.send(SseEvent::Error { message: e.to_string() });
            return;
        }
        let _ = tx.send(SseEvent::JobCreated { job_id: id.clone() });

        if let Err(e) = self.store.mark_running(&id).await {
            warn!(job_id = %id, error = %e, "failed to mark job running");
        }

        self.execute(&id, &prompt_text, &model, &tx).await;
    }

    #[allow(clippy::too_many_lines)]
    async fn execute(&self, id: &str, prompt_text: &str, model: &str, tx: &mpsc::UnboundedSender<SseEvent>) {
        let pipeline_started = Instant::now();

        let _ = tx.send(SseEvent::Generating);
        let system = prompt::system_prompt_for(prompt_text);
        let generated = match nimbus_llm::generate(
            self.llm.as_ref(),
            &system,
            prompt_text,
            model,
            prompt::file_tree_schema(),
        )
        .await
        {
            Ok(result) => result,
            Err(e) => {
                self.fail(id, tx, None, None, e.to_string()).await;
                return;
            }
        };
        let _ = tx.send(SseEvent::Generated {
            file_count: generated.files.len(),
        });

        let file_count = generated.files.len() as i64;
        let lines_of_code = generated
            .files
            .iter()
            .map(|f| f.content.matches('\n').count() as i64)
            .sum::<i64>();

        let mut files = generated.files;
        let config = NimbusConfig::from_files(&files);
        let framework = resolve_framework(&files, &config);
        let target = resolve_target(framework, &config, prompt_text);

        if let Err(e) = normalize(&mut files, framework, target) {
            self.fail(id, tx, None, None, e.to_string()).await;
            return;
        }

        let sandbox = match self.sandboxes.provision(id).await {
            Ok(sandbox) => sandbox,
            Err(e) => {
                self.fail(id, tx, None, None, e.to_string()).await;
                return;
            }
        };

        let (sandbox_tx, mut sandbox_rx) = mpsc::unbounded_channel();
        let forward_tx = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = sandbox_rx.recv().await {
                if forward_tx.send(map_sandbox_event(event)).is_err() {
                    break;
                }
            }
        });

        let build_result = run_build(Arc::clone(&sandbox), id, files, framework, target, sandbox_tx).await;
        let _ = forwarder.await;

        let outcome = match build_result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.fail(id, tx, Some(sandbox.as_ref()), None, e.to_string()).await;
                self.destroy(sandbox.as_ref(), id).await;
                return;
            }
        };

        let _ = tx.send(SseEvent::Deploying);
        let deploy_started = Instant::now();
        let deploy_outcome = deploy(
            sandbox.as_ref(),
            &self.config.cloudflare_api_token,
            &self.config.cloudflare_account_id,
        )
        .await;
        let deploy_duration_ms = deploy_started.elapsed().as_millis() as i64;

        let deployed = match deploy_outcome {
            Ok(deployed) => deployed,
            Err(e) => {
                let deploy_log = match &e {
                    nimbus_deploy::DeployError::Failed { log } => Some(log.as_str()),
                    nimbus_deploy::DeployError::DeleteFailed { .. } => None,
                };
                self.fail(id, tx, Some(sandbox.as_ref()), deploy_log, e.to_string()).await;
                self.destroy(sandbox.as_ref(), id).await;
                return;
            }
        };
        let _ = tx.send(SseEvent::Deployed {
            deployed_url: deployed.deployed_url.clone(),
        });

        let (build_log_key, deploy_log_key) = self
            .archive_logs(Some(sandbox.as_ref()), id, Some(&deployed.deploy_log))
            .await;

        let total_duration_ms = pipeline_started.elapsed().as_millis() as i64;
        let metrics = CompletionMetrics {
            file_count,
            lines_of_code,
            prompt_tokens: generated.usage.prompt_tokens,
            completion_tokens: generated.usage.completion_tokens,
            total_tokens: generated.usage.total_tokens,
            cost: generated.usage.cost,
            llm_latency_ms: generated.llm_latency_ms,
            install_duration_ms: outcome.install_duration_ms,
            build_duration_ms: outcome.build_duration_ms,
            deploy_duration_ms,
            total_duration_ms,
        };
        let expires_at = nimbus_utils::now() + ChronoDuration::hours(24);
        let extras = TerminalExtras {
            expires_at,
            worker_name: Some(outcome.worker_name),
            build_log_key,
            deploy_log_key,
        };

        if let Err(e) = self
            .store
            .mark_completed(id, &deployed.deployed_url, metrics, extras)
            .await
        {
            warn!(job_id = %id, error = %e, "failed to record completed job");
        }

        let _ = tx.send(SseEvent::Complete {
            preview_url: deployed.deployed_url.clone(),
            deployed_url: deployed.deployed_url,
            metrics: CompletionMetricsView {
                file_count: metrics.file_count,
                lines_of_code: metrics.lines_of_code,
                prompt_tokens: metrics.prompt_tokens,
                completion_tokens: metrics.completion_tokens,
                total_tokens: metrics.total_tokens,
                cost: metrics.cost,
                llm_latency_ms: metrics.llm_latency_ms,
                install_duration_ms: metrics.install_duration_ms,
                build_duration_ms: metrics.build_duration_ms,
                deploy_duration_ms: metrics.deploy_duration_ms,
                total_duration_ms: metrics.total_duration_ms,
            },
        });

        self.destroy(sandbox.as_ref(), id).await;
    }

    /// Record a terminal failure: best-effort log archival from
    /// whatever was produced, then `markFailed`, then the terminal SSE
    /// event (spec §4.1 "Failure semantics").
    async fn fail(
        &self,
        id: &str,
        tx: &mpsc::UnboundedSender<SseEvent>,
        sandbox: Option<&dyn Sandbox>,
        deploy_log: Option<&str>,
        message: String,
    ) {
        let (build_log_key, deploy_log_key) = self.archive_logs(sandbox, id, deploy_log).await;
        let expires_at = nimbus_utils::now() + ChronoDuration::hours(24);
        if let Err(e) = self
            .store
            .mark_failed(id, &message, expires_at, build_log_key.as_deref(), deploy_log_key.as_deref())
            .await
        {
            warn!(job_id = %id, error = %e, "failed to record failed job");
        }
        let _ = tx.send(SseEvent::Error { message });
    }

    /// Upload whatever build/deploy log content is available to the log
    /// archive. Best-effort throughout: a failure here is logged and
    /// yields a `None` key, never a pipeline failure (spec §4.1 stage 6
    /// "This stage is best-effort").
    async fn archive_logs(
        &self,
        sandbox: Option<&dyn Sandbox>,
        id: &str,
        deploy_log: Option<&str>,
    ) -> (Option<String>, Option<String>) {
        let build_key = match sandbox {
            Some(sandbox) => match sandbox.read_log_tail(".nimbus/build.log", 200, 4000).await {
                Ok(tail) if !tail.is_empty() => self.put_log(id, &build_log_key(id), &tail).await,
                _ => None,
            },
            None => None,
        };

        let deploy_key = match deploy_log {
            Some(log) if !log.is_empty() => self.put_log(id, &deploy_log_key(id), log).await,
            _ => None,
        };

        (build_key, deploy_key)
    }

    async fn put_log(&self, id: &str, key: &str, body: &str) -> Option<String> {
        match self.archive.put(key, body).await {
            Ok(()) => Some(key.to_string()),
            Err(e) => {
                warn!(job_id = %id, key, error = %e, "failed to archive log");
                None
            }
        }
    }

    async fn destroy(&self, sandbox: &dyn Sandbox, id: &str) {
        if let Err(e) = sandbox.destroy().await {
            warn!(job_id = %id, error = %e, "sandbox teardown failed");
        }
    }
}

impl JobSpawner for JobPipeline {
    fn spawn(&self, prompt: String, model: Option<String>) -> mpsc::UnboundedReceiver<SseEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(prompt, model, tx).await });
        rx
    }
}

fn map_sandbox_event(event: SandboxEvent) -> SseEvent {
    match event {
        SandboxEvent::Scaffolding => SseEvent::Scaffolding,
        SandboxEvent::Writing => SseEvent::Writing,
        SandboxEvent::Installing => SseEvent::Installing,
        SandboxEvent::Building => SseEvent::Building,
        SandboxEvent::Log { phase, message } => SseEvent::Log { phase, message },
    }
}
