//! The build driver pipeline (spec §4.3 steps 1-7).

use crate::descriptor::{final_descriptor, next_pre_build_descriptor, passthrough_worker_source};
use crate::error::SandboxError;
use crate::events::SandboxEvent;
use crate::heartbeat::spawn_stage_tickers;
use crate::sandbox::{ExecOpts, Sandbox};
use nimbus_llm::GeneratedFile;
use nimbus_registry::{Framework, Target};
use nimbus_utils::worker_name;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);
const NON_NEXT_BUILD_TIMEOUT: Duration = Duration::from_secs(180);
const NEXT_BUILD_TIMEOUT: Duration = Duration::from_secs(120);
const OPENNEXT_PACKAGE_TIMEOUT: Duration = Duration::from_secs(60);
const ERROR_LOG_TAIL_CHARS: usize = 4000;

const STATIC_OUTPUT_CANDIDATES: &[&str] = &["dist", "build", ".output", "out"];

pub struct BuildOutcome {
    pub sandbox_id: String,
    pub install_duration_ms: i64,
    pub build_duration_ms: i64,
    pub worker_name: String,
}

/// Run the full sandbox build pipeline for one job: scaffold, write
/// files, install, build, verify artifacts, and write the final
/// deployment descriptor.
///
/// # Errors
/// Returns `SandboxError::BuildFailure` on nonzero install/build exit or
/// missing artifacts, carrying the sandbox id and a bounded log tail.
pub async fn run_build(
    sandbox: Arc<dyn Sandbox>,
    job_id: &str,
    mut files: Vec<GeneratedFile>,
    framework: &Framework,
    target: Target,
    events: mpsc::UnboundedSender<SandboxEvent>,
) -> Result<BuildOutcome, SandboxError> {
    let _ = events.send(SandboxEvent::Scaffolding);
    let name = worker_name(job_id);

    let _ = events.send(SandboxEvent::Writing);
    for file in &files {
        sandbox.write_file(&file.path, file.content.as_bytes()).await?;
    }

    let has_package_json = files.iter().any(|f| f.path == "package.json");
    let next_on_workers = framework.id == "next" && target == Target::Workers;

    if next_on_workers {
        let descriptor = next_pre_build_descriptor(&name);
        sandbox.write_file("wrangler.toml", descriptor.as_bytes()).await?;
        sandbox.write_file("wrangler.nimbus.toml", descriptor.as_bytes()).await?;
    }

    let mut install_duration_ms = 0i64;
    if has_package_json {
        let _ = events.send(SandboxEvent::Installing);
        install_duration_ms = run_timed_stage(
            &sandbox,
            &events,
            "install",
            ".nimbus/install.log",
            SandboxEvent::Installing,
            "bun",
            &["install", "--no-save"],
            INSTALL_TIMEOUT,
            &[],
        )
        .await?;
    }

    let has_build_script = has_build_script(&files);
    let mut build_duration_ms = 0i64;
    if has_build_script {
        let _ = events.send(SandboxEvent::Building);

        if next_on_workers {
            build_duration_ms += run_timed_stage(
                &sandbox,
                &events,
                "build",
                ".nimbus/build.log",
                SandboxEvent::Building,
                "bunx",
                &["next", "build"],
                NEXT_BUILD_TIMEOUT,
                &[],
            )
            .await?;

            ensure_artifact(&sandbox, ".next/standalone", "build").await?;

            build_duration_ms += run_timed_stage(
                &sandbox,
                &events,
                "build",
                ".nimbus/build.log",
                SandboxEvent::Building,
                "bunx",
                &[
                    "opennextjs-cloudflare",
                    "build",
                    "--skipNextBuild",
                    "--skipWranglerConfigCheck",
                    "--noMinify",
                ],
                OPENNEXT_PACKAGE_TIMEOUT,
                &[],
            )
            .await?;
        } else {
            build_duration_ms += run_timed_stage(
                &sandbox,
                &events,
                "build",
                ".nimbus/build.log",
                SandboxEvent::Building,
                "bun",
                &["run", "build"],
                NON_NEXT_BUILD_TIMEOUT,
                &[("CI", "true")],
            )
            .await?;
        }
    }

    let (main, assets_dir) = verify_and_resolve_artifacts(&sandbox, framework, target, &mut files).await?;
    let descriptor = final_descriptor(&name, &main, assets_dir.as_deref());
    sandbox.write_file("wrangler.nimbus.toml", descriptor.as_bytes()).await?;

    Ok(BuildOutcome {
        sandbox_id: sandbox.id().to_string(),
        install_duration_ms,
        build_duration_ms,
        worker_name: name,
    })
}

#[allow(clippy::too_many_arguments)]
async fn run_timed_stage(
    sandbox: &Arc<dyn Sandbox>,
    events: &mpsc::UnboundedSender<SandboxEvent>,
    phase: &str,
    log_path: &str,
    heartbeat_event: SandboxEvent,
    cmd: &str,
    args: &[&str],
    timeout: Duration,
    env: &[(&str, &str)],
) -> Result<i64, SandboxError> {
    let tickers = spawn_stage_tickers(
        Arc::clone(sandbox),
        events.clone(),
        heartbeat_event,
        phase.to_string(),
        log_path.to_string(),
    );

    let mut opts = ExecOpts::with_timeout(timeout).log_to(log_path);
    for (key, value) in env {
        opts = opts.env(*key, *value);
    }

    let started = std::time::Instant::now();
    let result = sandbox.exec(cmd, args, opts).await;
    let elapsed_ms = started.elapsed().as_millis() as i64;

    tickers.stop();

    let output = result?;
    if !output.success() {
        let log_tail = sandbox
            .read_log_tail(log_path, 200, ERROR_LOG_TAIL_CHARS)
            .await
            .unwrap_or_default();
        return Err(SandboxError::BuildFailure {
            sandbox_id: sandbox.id().to_string(),
            phase: phase.to_string(),
            log_tail,
        });
    }

    Ok(elapsed_ms)
}

async fn ensure_artifact(sandbox: &Arc<dyn Sandbox>, path: &str, phase: &str) -> Result<(), SandboxError> {
    if sandbox.file_exists(path).await? {
        Ok(())
    } else {
        let log_tail = sandbox
            .read_log_tail(".nimbus/build.log", 200, ERROR_LOG_TAIL_CHARS)
            .await
            .unwrap_or_default();
        Err(SandboxError::BuildFailure {
            sandbox_id: sandbox.id().to_string(),
            phase: phase.to_string(),
            log_tail: format!("missing required artifact: {path}\n{log_tail}"),
        })
    }
}

fn has_build_script(files: &[GeneratedFile]) -> bool {
    files
        .iter()
        .find(|f| f.path == "package.json")
        .and_then(|f| serde_json::from_str::<serde_json::Value>(&f.content).ok())
        .and_then(|v| v.get("scripts").and_then(|s| s.get("build")).map(|_| ()))
        .is_some()
}

/// Verify the required build artifacts exist for the resolved
/// framework/target and return the worker `main` entry and assets dir
/// for the final descriptor (spec §4.3 step 6).
async fn verify_and_resolve_artifacts(
    sandbox: &Arc<dyn Sandbox>,
    framework: &Framework,
    target: Target,
    files: &mut Vec<GeneratedFile>,
) -> Result<(String, Option<String>), SandboxError> {
    if framework.id == "next" && target == Target::Workers {
        ensure_artifact(sandbox, ".open-next/worker.js", "build").await?;
        ensure_artifact(sandbox, ".open-next/assets", "build").await?;
        return Ok((".open-next/worker.js".to_string(), Some(".open-next/assets".to_string())));
    }

    if target == Target::Workers {
        let output = framework.output_for(target);
        let worker_entry = output
            .and_then(|o| o.worker_entry)
            .ok_or_else(|| SandboxError::BuildFailure {
                sandbox_id: sandbox.id().to_string(),
                phase: "build".to_string(),
                log_tail: "workers target requires config.workerEntry".to_string(),
            })?;
        ensure_artifact(sandbox, worker_entry, "build").await?;

        let assets_dir = output.and_then(|o| o.assets_dir);
        if let Some(assets_dir) = assets_dir {
            ensure_artifact(sandbox, assets_dir, "build").await?;
            ensure_worker_js_not_shadowed(sandbox, assets_dir, files).await?;
        }
        return Ok((worker_entry.to_string(), assets_dir.map(str::to_string)));
    }

    // Static/default: pick the first existing candidate directory.
    let mut assets_dir = None;
    for candidate in STATIC_OUTPUT_CANDIDATES {
        if sandbox.file_exists(candidate).await? {
            assets_dir = Some((*candidate).to_string());
            break;
        }
    }

    let worker_entry = resolve_static_worker_entry(sandbox, files).await?;
    Ok((worker_entry, assets_dir))
}

async fn resolve_static_worker_entry(
    sandbox: &Arc<dyn Sandbox>,
    files: &mut Vec<GeneratedFile>,
) -> Result<String, SandboxError> {
    for candidate in ["worker.js", "worker.ts"] {
        if files.iter().any(|f| f.path == candidate) {
            return Ok(candidate.to_string());
        }
    }

    sandbox
        .write_file("worker.js", passthrough_worker_source().as_bytes())
        .await?;
    Ok("worker.js".to_string())
}

async fn ensure_worker_js_not_shadowed(
    sandbox: &Arc<dyn Sandbox>,
    assets_dir: &str,
    files: &[GeneratedFile],
) -> Result<(), SandboxError> {
    let embedded_worker_present = files
        .iter()
        .any(|f| f.path.starts_with(&format!("{assets_dir}/_worker.js")));
    if !embedded_worker_present {
        return Ok(());
    }

    let ignore_path = format!("{assets_dir}/.assetsignore");
    let existing = sandbox.read_log_tail(&ignore_path, usize::MAX, usize::MAX).await.unwrap_or_default();
    if !existing.contains("_worker.js") {
        let mut contents = existing;
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str("_worker.js\n");
        sandbox.write_file(&ignore_path, contents.as_bytes()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalSandbox;
    use nimbus_registry::STATIC_SITE;

    #[test]
    fn detects_build_script_in_package_json() {
        let files = vec![GeneratedFile {
            path: "package.json".to_string(),
            content: serde_json::json!({ "scripts": { "build": "vite build" } }).to_string(),
        }];
        assert!(has_build_script(&files));
    }

    #[test]
    fn missing_build_script_is_detected() {
        let files = vec![GeneratedFile {
            path: "package.json".to_string(),
            content: "{}".to_string(),
        }];
        assert!(!has_build_script(&files));
    }

    #[tokio::test]
    async fn static_site_with_no_package_json_runs_to_completion() {
        let sandbox: Arc<dyn Sandbox> = Arc::new(LocalSandbox::new("job_static01").unwrap());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let files = vec![GeneratedFile {
            path: "index.html".to_string(),
            content: "<html></html>".to_string(),
        }];

        let outcome = run_build(sandbox, "job_static01", files, &STATIC_SITE, Target::Static, tx)
            .await
            .unwrap();

        assert_eq!(outcome.install_duration_ms, 0);
        assert_eq!(outcome.build_duration_ms, 0);
        assert!(outcome.worker_name.starts_with("nimbus-"));

        let mut saw_writing = false;
        while let Ok(event) = rx.try_recv() {
            if event == SandboxEvent::Writing {
                saw_writing = true;
            }
        }
        assert!(saw_writing);
    }
}
