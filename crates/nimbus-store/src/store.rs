//! The job store (spec §4.5, C1): a thin `sqlx::SqlitePool` wrapper
//! exposing the exact operations the pipeline and sweeper need.

use crate::error::StoreError;
use crate::job::{CompletionMetrics, Job, JobListItem, JobStatus, TerminalExtras};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn create_job(&self, id: &str, prompt: &str, model: &str) -> Result<Job, StoreError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO jobs (id, prompt, model, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(prompt)
        .bind(model)
        .bind(JobStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_job(id)
            .await?
            .ok_or_else(|| StoreError::Archive(format!("job {id} vanished immediately after insert")))
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Newest-first per spec §4.5, bounded by `limit`.
    pub async fn list_jobs(&self, limit: i64) -> Result<Vec<JobListItem>, StoreError> {
        let rows = sqlx::query_as::<_, JobListItem>(
            "SELECT id, prompt, model, status, created_at, deployed_url \
             FROM jobs ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|mut row| {
                row.prompt = JobListItem::truncate_prompt(&row.prompt);
                row
            })
            .collect())
    }

    pub async fn mark_running(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE jobs SET status = ?, started_at = ? WHERE id = ?")
            .bind(JobStatus::Running.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_completed(
        &self,
        id: &str,
        deployed_url: &str,
        metrics: CompletionMetrics,
        extras: TerminalExtras,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE jobs SET \
                status = ?, completed_at = ?, expires_at = ?, \
                deployed_url = ?, preview_url = ?, \
                file_count = ?, lines_of_code = ?, \
                prompt_tokens = ?, completion_tokens = ?, total_tokens = ?, cost = ?, \
                llm_latency_ms = ?, install_duration_ms = ?, build_duration_ms = ?, \
                deploy_duration_ms = ?, total_duration_ms = ?, \
                worker_name = ?, build_log_key = ?, deploy_log_key = ? \
             WHERE id = ?",
        )
        .bind(JobStatus::Completed.as_str())
        .bind(Utc::now())
        .bind(extras.expires_at)
        .bind(deployed_url)
        .bind(deployed_url)
        .bind(metrics.file_count)
        .bind(metrics.lines_of_code)
        .bind(metrics.prompt_tokens)
        .bind(metrics.completion_tokens)
        .bind(metrics.total_tokens)
        .bind(metrics.cost)
        .bind(metrics.llm_latency_ms)
        .bind(metrics.install_duration_ms)
        .bind(metrics.build_duration_ms)
        .bind(metrics.deploy_duration_ms)
        .bind(metrics.total_duration_ms)
        .bind(extras.worker_name)
        .bind(extras.build_log_key)
        .bind(extras.deploy_log_key)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `expires_at` is set on failure the same as on completion (spec
    /// §4.1 failure semantics "sets `expires_at`"), so the cleanup
    /// sweeper's `status ∈ {completed, failed}` selection (spec §4.7)
    /// eventually reclaims failed jobs too.
    pub async fn mark_failed(
        &self,
        id: &str,
        message: &str,
        expires_at: DateTime<Utc>,
        build_log_key: Option<&str>,
        deploy_log_key: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE jobs SET status = ?, completed_at = ?, expires_at = ?, error_message = ?, \
             build_log_key = ?, deploy_log_key = ? WHERE id = ?",
        )
        .bind(JobStatus::Failed.as_str())
        .bind(Utc::now())
        .bind(expires_at)
        .bind(message)
        .bind(build_log_key)
        .bind(deploy_log_key)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the archive keys recorded against a job, for the logs
    /// endpoint to resolve without fetching the whole row.
    pub async fn get_job_log_keys(
        &self,
        id: &str,
    ) -> Result<Option<(Option<String>, Option<String>)>, StoreError> {
        let row: Option<(Option<String>, Option<String>)> =
            sqlx::query_as("SELECT build_log_key, deploy_log_key FROM jobs WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    /// Jobs whose `expires_at` has passed, oldest first, for the
    /// cleanup sweeper (spec §4.7). Never selects a job still pending
    /// or running — only terminal jobs have an `expires_at` set.
    pub async fn select_expirable(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let ids: Vec<(String,)> = sqlx::query_as(
            "SELECT id FROM jobs \
             WHERE expires_at IS NOT NULL AND expires_at <= ? AND status != ? \
             ORDER BY expires_at ASC LIMIT ?",
        )
        .bind(now)
        .bind(JobStatus::Expired.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Idempotent: marking an already-expired job expired again is a
    /// no-op success (spec §4.7 "idempotent per row").
    pub async fn mark_expired(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE jobs SET status = ? WHERE id = ?")
            .bind(JobStatus::Expired.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    async fn test_store() -> JobStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        JobStore::new(pool)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = test_store().await;
        let job = store.create_job("job_abc12345", "build me a todo app", "anthropic/claude-3.5").await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.prompt, "build me a todo app");

        let fetched = store.get_job("job_abc12345").await.unwrap().unwrap();
        assert_eq!(fetched.id, "job_abc12345");
    }

    #[tokio::test]
    async fn get_missing_job_returns_none() {
        let store = test_store().await;
        assert!(store.get_job("job_nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_jobs_truncates_long_prompts_and_orders_newest_first() {
        let store = test_store().await;
        store.create_job("job_one", &"a".repeat(150), "m").await.unwrap();
        store.create_job("job_two", "short prompt", "m").await.unwrap();

        let items = store.list_jobs(10).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "job_two");
        assert!(items[1].prompt.ends_with('…'));
        assert_eq!(items[1].prompt.chars().count(), 101);
    }

    #[tokio::test]
    async fn mark_running_then_completed_updates_status() {
        let store = test_store().await;
        store.create_job("job_life", "prompt", "m").await.unwrap();
        store.mark_running("job_life").await.unwrap();
        assert_eq!(store.get_job("job_life").await.unwrap().unwrap().status, JobStatus::Running);

        let extras = TerminalExtras {
            expires_at: Utc::now() + ChronoDuration::hours(24),
            worker_name: Some("nimbus-ab12cd34".to_string()),
            build_log_key: Some("jobs/job_life/build.log".to_string()),
            deploy_log_key: Some("jobs/job_life/deploy.log".to_string()),
        };
        store
            .mark_completed("job_life", "https://nimbus-ab12cd34.workers.dev", CompletionMetrics::default(), extras)
            .await
            .unwrap();

        let job = store.get_job("job_life").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.deployed_url.as_deref(), Some("https://nimbus-ab12cd34.workers.dev"));
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn mark_failed_records_error_message() {
        let store = test_store().await;
        store.create_job("job_fail", "prompt", "m").await.unwrap();
        let expires_at = Utc::now() + ChronoDuration::hours(24);
        store
            .mark_failed("job_fail", "build failed: exit 1", expires_at, Some("jobs/job_fail/build.log"), None)
            .await
            .unwrap();

        let job = store.get_job("job_fail").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("build failed: exit 1"));
        assert!(job.expires_at.is_some());
    }

    #[tokio::test]
    async fn select_expirable_only_returns_past_due_terminal_jobs() {
        let store = test_store().await;
        store.create_job("job_expired", "p", "m").await.unwrap();
        let extras = TerminalExtras {
            expires_at: Utc::now() - ChronoDuration::hours(1),
            worker_name: None,
            build_log_key: None,
            deploy_log_key: None,
        };
        store.mark_completed("job_expired", "https://x.workers.dev", CompletionMetrics::default(), extras).await.unwrap();

        store.create_job("job_pending", "p", "m").await.unwrap();

        let expirable = store.select_expirable(50, Utc::now()).await.unwrap();
        assert_eq!(expirable, vec!["job_expired".to_string()]);

        store.mark_expired("job_expired").await.unwrap();
        assert!(store.select_expirable(50, Utc::now()).await.unwrap().is_empty());
    }
}
