//! Infrastructure layer: configuration, storage, cache, feed retrieval and
//! the import jobs.

pub mod cache;
pub mod config;
pub mod importer;
pub mod jobs;
pub mod source;
pub mod stats;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use config::{ConfigError, ImportSettings, Settings};
pub use importer::{ImportError, ImportStats, ProductImporter};
pub use source::{FeedOrigin, FeedPayload, FeedSource};
pub use stats::{CategoryStatsService, StatsError, StatsSnapshot};
