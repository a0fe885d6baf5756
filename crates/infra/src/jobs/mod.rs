//! Background import jobs with retry, backoff and a wall-clock aligned schedule.
//!
//! ## Components
//!
//! - `RetryPolicy`: fixed, linear or exponential backoff with a cap
//! - `ImportJobRunner`: runs an import with retries, invalidates the statistic
//!   cache on success
//! - `ImportScheduler`: fires the runner on aligned ticks until shut down

pub mod executor;
pub mod scheduler;
pub mod types;

pub use executor::{ImportJobRunner, ImportTask};
pub use scheduler::{next_aligned_tick, ImportScheduler, SchedulerConfig, SchedulerHandle, SchedulerStats};
pub use types::{
    BackoffStrategy, ImportRun, ImportTrigger, JobAttemptRecord, JobId, JobStatus, RetryPolicy,
};
