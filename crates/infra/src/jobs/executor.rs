//! Import job runner with retry and backoff.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::importer::{ImportError, ImportStats, ProductImporter};
use crate::stats::CategoryStatsService;

use super::types::{ImportRun, ImportTrigger, JobStatus, RetryPolicy};

/// The unit of work retried by the runner.
#[async_trait]
pub trait ImportTask: Send + Sync {
    async fn import(&self) -> Result<ImportStats, ImportError>;
}

#[async_trait]
impl ImportTask for ProductImporter {
    async fn import(&self) -> Result<ImportStats, ImportError> {
        self.import_products().await
    }
}

/// Runs imports, retrying failures with backoff and invalidating the
/// statistic cache after a success.
///
/// At most one run executes at a time per runner.
pub struct ImportJobRunner {
    task: Arc<dyn ImportTask>,
    stats: Arc<CategoryStatsService>,
    policy: RetryPolicy,
    busy: Mutex<()>,
}

impl ImportJobRunner {
    pub fn new(task: Arc<dyn ImportTask>, stats: Arc<CategoryStatsService>, policy: RetryPolicy) -> Self {
        Self {
            task,
            stats,
            policy,
            busy: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run an import, waiting for any run already in progress.
    pub async fn run(&self, trigger: ImportTrigger) -> ImportRun {
        let _guard = self.busy.lock().await;
        self.execute(trigger).await
    }

    /// Run an import unless one is already in progress.
    pub async fn try_run(&self, trigger: ImportTrigger) -> Option<ImportRun> {
        let _guard = self.busy.try_lock().ok()?;
        Some(self.execute(trigger).await)
    }

    async fn execute(&self, trigger: ImportTrigger) -> ImportRun {
        let mut run = ImportRun::new(trigger);
        info!(job_id = %run.id, trigger = %trigger, "import run started");

        loop {
            run.mark_running();
            let started = Utc::now();

            match self.task.import().await {
                Ok(stats) => {
                    run.mark_completed(started, stats);
                    if let Err(e) = self.stats.invalidate().await {
                        warn!(job_id = %run.id, error = %e, "failed to invalidate stats cache");
                    }
                    info!(job_id = %run.id, attempts = run.attempt(), stats = %stats, "import run completed");
                    return run;
                }
                Err(e) => {
                    run.mark_failed(e.to_string(), started, &self.policy);
                    match &run.status {
                        JobStatus::Failed { attempt, .. } => {
                            let delay = self.policy.delay_for_attempt(*attempt);
                            warn!(
                                job_id = %run.id,
                                attempt = *attempt,
                                retry_in_ms = delay.as_millis() as u64,
                                error = %e,
                                "import attempt failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        _ => {
                            error!(job_id = %run.id, attempts = run.attempt(), error = %e, "import run dead-lettered");
                            return run;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryStatsCache, StatsCache, AVG_PRICE_BY_CATEGORY_KEY};
    use crate::store::InMemoryProductStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyTask {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyTask {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ImportTask for FlakyTask {
        async fn import(&self) -> Result<ImportStats, ImportError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(ImportError::NoSource)
            } else {
                Ok(ImportStats {
                    created: 3,
                    total_processed: 3,
                    ..Default::default()
                })
            }
        }
    }

    fn runner(task: Arc<dyn ImportTask>, cache: Arc<InMemoryStatsCache>, policy: RetryPolicy) -> ImportJobRunner {
        let stats = Arc::new(CategoryStatsService::new(
            Arc::new(InMemoryProductStore::new()),
            cache,
            Duration::from_secs(300),
        ));
        ImportJobRunner::new(task, stats, policy)
    }

    #[tokio::test]
    async fn success_invalidates_cache() {
        let cache = Arc::new(InMemoryStatsCache::new());
        cache
            .set(AVG_PRICE_BY_CATEGORY_KEY, serde_json::json!([]), Duration::from_secs(300))
            .await
            .unwrap();

        let runner = runner(Arc::new(FlakyTask::new(0)), cache.clone(), RetryPolicy::import(3));
        let run = runner.run(ImportTrigger::Manual).await;

        assert_eq!(run.status, JobStatus::Completed);
        assert_eq!(run.attempts.len(), 1);
        assert_eq!(run.stats.map(|s| s.created), Some(3));
        assert_eq!(cache.get(AVG_PRICE_BY_CATEGORY_KEY).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let task = Arc::new(FlakyTask::new(2));
        let runner = runner(task.clone(), Arc::new(InMemoryStatsCache::new()), RetryPolicy::import(3));

        let run = runner.run(ImportTrigger::Schedule).await;

        assert_eq!(run.status, JobStatus::Completed);
        assert_eq!(task.calls.load(Ordering::SeqCst), 3);
        let outcomes: Vec<bool> = run.attempts.iter().map(|a| a.success).collect();
        assert_eq!(outcomes, vec![false, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_letters_after_max_attempts() {
        let task = Arc::new(FlakyTask::new(u32::MAX));
        let cache = Arc::new(InMemoryStatsCache::new());
        cache
            .set(AVG_PRICE_BY_CATEGORY_KEY, serde_json::json!([]), Duration::from_secs(3600))
            .await
            .unwrap();
        let runner = runner(task.clone(), cache.clone(), RetryPolicy::import(3));

        let run = runner.run(ImportTrigger::Schedule).await;

        assert!(matches!(run.status, JobStatus::DeadLettered { attempts: 4, .. }));
        assert_eq!(task.calls.load(Ordering::SeqCst), 4);
        assert!(run.stats.is_none());
        assert!(cache.get(AVG_PRICE_BY_CATEGORY_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn no_retry_policy_runs_once() {
        let task = Arc::new(FlakyTask::new(1));
        let runner = runner(task.clone(), Arc::new(InMemoryStatsCache::new()), RetryPolicy::no_retry());
        let run = runner.run(ImportTrigger::Manual).await;
        assert!(matches!(run.status, JobStatus::DeadLettered { attempts: 1, .. }));
        assert_eq!(task.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn try_run_skips_when_busy() {
        let runner = runner(Arc::new(FlakyTask::new(0)), Arc::new(InMemoryStatsCache::new()), RetryPolicy::no_retry());
        let _guard = runner.busy.lock().await;
        assert!(runner.try_run(ImportTrigger::Schedule).await.is_none());
    }
}
