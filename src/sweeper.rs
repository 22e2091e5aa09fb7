//! The cleanup sweeper (spec §4.7, C9): on a fixed interval, reclaims
//! every job whose `expiresAt` has passed — tears down its edge worker,
//! deletes its archived logs, and marks it `expired`.

use chrono::Utc;
use nimbus_deploy::EdgeWorkerApi;
use nimbus_store::{build_log_key, deploy_log_key, JobStore, LogArchive};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SELECT_BATCH_LIMIT: i64 = 50;

pub struct Sweeper {
    store: JobStore,
    archive: Arc<dyn LogArchive>,
    edge_workers: Arc<dyn EdgeWorkerApi>,
    interval: Duration,
}

impl Sweeper {
    #[must_use]
    pub fn new(
        store: JobStore,
        archive: Arc<dyn LogArchive>,
        edge_workers: Arc<dyn EdgeWorkerApi>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            archive,
            edge_workers,
            interval,
        }
    }

    /// Run the sweep loop forever. Intended to be spawned as a
    /// standalone background task alongside the HTTP server.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    /// One sweep pass: select up to `SELECT_BATCH_LIMIT` expirable jobs
    /// and reclaim each independently. A failure reclaiming one job is
    /// logged and does not block the rest (spec §4.7 "idempotent per
    /// row").
    pub async fn sweep_once(&self) {
        let expirable = match self.store.select_expirable(SELECT_BATCH_LIMIT, Utc::now()).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "failed to select expirable jobs");
                return;
            }
        };

        if expirable.is_empty() {
            return;
        }
        info!(count = expirable.len(), "sweeping expired jobs");

        for id in expirable {
            self.reclaim(&id).await;
        }
    }

    async fn reclaim(&self, id: &str) {
        let job = match self.store.get_job(id).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                warn!(job_id = id, error = %e, "failed to load job during sweep");
                return;
            }
        };

        if let Some(worker_name) = &job.worker_name {
            if let Err(e) = self.edge_workers.delete_worker(worker_name).await {
                warn!(job_id = id, worker_name, error = %e, "failed to delete edge worker, skipping job");
                return;
            }
        }

        self.delete_log(id, job.build_log_key.as_deref()).await;
        self.delete_log(id, job.deploy_log_key.as_deref()).await;

        if let Err(e) = self.store.mark_expired(id).await {
            warn!(job_id = id, error = %e, "failed to mark job expired");
        }
    }

    async fn delete_log(&self, job_id: &str, key: Option<&str>) {
        let Some(key) = key else { return };
        if let Err(e) = self.archive.delete(key).await {
            warn!(job_id, key, error = %e, "failed to delete archived log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nimbus_deploy::DeployError;
    use nimbus_store::{CompletionMetrics, TerminalExtras};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeEdgeWorkers {
        deleted: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EdgeWorkerApi for FakeEdgeWorkers {
        async fn delete_worker(&self, worker_name: &str) -> Result<(), DeployError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.deleted.lock().unwrap().push(worker_name.to_string());
            Ok(())
        }
    }

    async fn test_store() -> JobStore {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("../crates/nimbus-store/migrations").run(&pool).await.unwrap();
        JobStore::new(pool)
    }

    #[tokio::test]
    async fn sweep_deletes_worker_and_logs_then_marks_expired() {
        let store = test_store().await;
        store.create_job("job_sweep1", "p", "m").await.unwrap();
        let extras = TerminalExtras {
            expires_at: Utc::now() - chrono::Duration::hours(1),
            worker_name: Some("nimbus-ab12cd34".to_string()),
            build_log_key: Some(build_log_key("job_sweep1")),
            deploy_log_key: Some(deploy_log_key("job_sweep1")),
        };
        store
            .mark_completed("job_sweep1", "https://nimbus-ab12cd34.workers.dev", CompletionMetrics::default(), extras)
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let archive: Arc<dyn LogArchive> = Arc::new(nimbus_store::FsLogArchive::new(dir.path()));
        archive.put(&build_log_key("job_sweep1"), "build ok").await.unwrap();
        archive.put(&deploy_log_key("job_sweep1"), "deploy ok").await.unwrap();

        let edge_workers = Arc::new(FakeEdgeWorkers::default());
        let sweeper = Sweeper::new(store.clone(), Arc::clone(&archive), edge_workers.clone(), Duration::from_secs(3600));

        sweeper.sweep_once().await;

        assert_eq!(edge_workers.calls.load(Ordering::SeqCst), 1);
        assert_eq!(edge_workers.deleted.lock().unwrap()[0], "nimbus-ab12cd34");
        assert!(archive.get(&build_log_key("job_sweep1")).await.unwrap().is_none());
        let job = store.get_job("job_sweep1").await.unwrap().unwrap();
        assert_eq!(job.status, nimbus_store::JobStatus::Expired);
    }

    #[tokio::test]
    async fn sweep_is_a_no_op_when_nothing_is_expirable() {
        let store = test_store().await;
        let dir = tempfile::tempdir().unwrap();
        let archive: Arc<dyn LogArchive> = Arc::new(nimbus_store::FsLogArchive::new(dir.path()));
        let edge_workers = Arc::new(FakeEdgeWorkers::default());
        let sweeper = Sweeper::new(store, archive, edge_workers.clone(), Duration::from_secs(3600));

        sweeper.sweep_once().await;

        assert_eq!(edge_workers.calls.load(Ordering::SeqCst), 0);
    }
}
