//! Periodic import scheduler.
//!
//! Ticks are aligned to the wall clock: with a 5 minute period the import fires
//! at :00, :05, :10 and so on, like a `*/5` cron entry. A tick that comes due
//! while a run is still in progress is skipped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::executor::ImportJobRunner;
use super::types::{ImportRun, ImportTrigger, JobStatus};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub run_on_startup: bool,
    /// Name for logging
    pub name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            run_on_startup: false,
            name: "import-scheduler".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_run_on_startup(mut self, run_on_startup: bool) -> Self {
        self.run_on_startup = run_on_startup;
        self
    }
}

/// Scheduler runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_dead_lettered: u64,
    pub ticks_skipped: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_status: Option<JobStatus>,
}

/// Handle to control a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
    stats: Arc<Mutex<SchedulerStats>>,
}

impl SchedulerHandle {
    /// Request shutdown and wait for the loop to exit. A run in progress is
    /// abandoned; its store transaction is rolled back.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            warn!(error = %e, "import scheduler task ended abnormally");
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        match self.stats.lock() {
            Ok(s) => s.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

pub struct ImportScheduler {
    runner: Arc<ImportJobRunner>,
    config: SchedulerConfig,
}

impl ImportScheduler {
    pub fn new(runner: Arc<ImportJobRunner>, config: SchedulerConfig) -> Self {
        Self { runner, config }
    }

    /// Spawn the scheduler loop on the current tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(Mutex::new(SchedulerStats::default()));
        let join = tokio::spawn(scheduler_loop(self, shutdown_rx, stats.clone()));

        SchedulerHandle {
            shutdown: shutdown_tx,
            join,
            stats,
        }
    }
}

/// The first multiple of `period` (counted from the Unix epoch) strictly after `now`.
///
/// When that instant is not representable the tick falls back to `now + period`,
/// saturating at the latest representable time.
pub fn next_aligned_tick(now: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    let period_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX).max(1);
    let now_ms = now.timestamp_millis();
    let aligned = now_ms
        .div_euclid(period_ms)
        .checked_add(1)
        .and_then(|n| n.checked_mul(period_ms))
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .filter(|tick| *tick > now);

    aligned.unwrap_or_else(|| {
        chrono::Duration::from_std(period)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

async fn scheduler_loop(
    scheduler: ImportScheduler,
    mut shutdown: watch::Receiver<bool>,
    stats: Arc<Mutex<SchedulerStats>>,
) {
    let ImportScheduler { runner, config } = scheduler;
    info!(
        scheduler = %config.name,
        interval_secs = config.interval.as_secs(),
        "import scheduler started"
    );

    if config.run_on_startup {
        let run = tokio::select! {
            run = runner.run(ImportTrigger::Startup) => Some(run),
            _ = shutdown.changed() => None,
        };
        match run {
            Some(run) => record(&stats, &run),
            None => {
                info!(scheduler = %config.name, "import scheduler stopped");
                return;
            }
        }
    }

    loop {
        let now = Utc::now();
        let next = next_aligned_tick(now, config.interval);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(scheduler = %config.name, next_tick = %next, "waiting for next tick");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }

        let tick = next;
        let outcome = tokio::select! {
            run = runner.try_run(ImportTrigger::Schedule) => Some(run),
            _ = shutdown.changed() => None,
        };
        match outcome {
            Some(Some(run)) => {
                record(&stats, &run);
                let missed = missed_ticks(tick, Utc::now(), config.interval);
                if missed > 0 {
                    warn!(scheduler = %config.name, missed, "import outlasted the schedule, ticks skipped");
                    update(&stats, |s| s.ticks_skipped += missed);
                }
            }
            Some(None) => {
                debug!(scheduler = %config.name, "import already running, tick skipped");
                update(&stats, |s| s.ticks_skipped += 1);
            }
            None => break,
        }
    }

    info!(scheduler = %config.name, "import scheduler stopped");
}

/// Ticks strictly after `tick` and no later than `now`.
fn missed_ticks(tick: DateTime<Utc>, now: DateTime<Utc>, period: Duration) -> u64 {
    let period_ms = period.as_millis().max(1) as i64;
    let elapsed = (now - tick).num_milliseconds();
    if elapsed < period_ms {
        0
    } else {
        (elapsed / period_ms) as u64
    }
}

fn update(stats: &Mutex<SchedulerStats>, f: impl FnOnce(&mut SchedulerStats)) {
    match stats.lock() {
        Ok(mut s) => f(&mut s),
        Err(poisoned) => f(&mut poisoned.into_inner()),
    }
}

fn record(stats: &Mutex<SchedulerStats>, run: &ImportRun) {
    update(stats, |s| {
        s.runs_started += 1;
        match run.status {
            JobStatus::Completed => s.runs_completed += 1,
            JobStatus::DeadLettered { .. } => s.runs_dead_lettered += 1,
            _ => {}
        }
        s.last_run_at = Some(run.started_at);
        s.last_status = Some(run.status.clone());
    });
}
