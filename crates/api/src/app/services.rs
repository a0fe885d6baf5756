use std::sync::Arc;

use anyhow::Context;

use prodstats_infra::{
    cache::{InMemoryStatsCache, StatsCache},
    jobs::{ImportJobRunner, RetryPolicy},
    store::{InMemoryProductStore, ProductStore},
    CategoryStatsService, FeedSource, ProductImporter, Settings,
};

#[cfg(feature = "redis")]
use prodstats_infra::{cache::RedisStatsCache, store::PostgresProductStore};

/// Everything the handlers and the CLI need, wired once per process.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn ProductStore>,
    pub stats: Arc<CategoryStatsService>,
    pub importer: Arc<ProductImporter>,
    /// Runner used by the periodic import (retry + backoff).
    pub runner: Arc<ImportJobRunner>,
    pub page_size: usize,
}

impl AppServices {
    pub fn new(store: Arc<dyn ProductStore>, cache: Arc<dyn StatsCache>, settings: &Settings) -> Self {
        let stats = Arc::new(CategoryStatsService::new(
            store.clone(),
            cache,
            settings.stats_cache_ttl,
        ));
        let importer = Arc::new(ProductImporter::new(
            FeedSource::from_settings(&settings.import),
            store.clone(),
        ));
        let runner = Arc::new(ImportJobRunner::new(
            importer.clone(),
            stats.clone(),
            RetryPolicy::import(settings.import.max_retries),
        ));

        Self {
            store,
            stats,
            importer,
            runner,
            page_size: settings.page_size,
        }
    }

    /// In-memory store and cache (dev/test).
    pub fn in_memory(settings: &Settings) -> Self {
        Self::new(
            Arc::new(InMemoryProductStore::new()),
            Arc::new(InMemoryStatsCache::new()),
            settings,
        )
    }

    /// A runner over the same importer and cache with a different retry policy.
    pub fn import_runner(&self, policy: RetryPolicy) -> ImportJobRunner {
        ImportJobRunner::new(self.importer.clone(), self.stats.clone(), policy)
    }
}

pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    if settings.use_persistent_stores {
        #[cfg(feature = "redis")]
        {
            return build_persistent_services(settings).await;
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but redis feature not enabled, falling back to in-memory"
            );
        }
    }

    tracing::info!("using in-memory product store and stats cache");
    Ok(AppServices::in_memory(settings))
}

#[cfg(feature = "redis")]
async fn build_persistent_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let store = PostgresProductStore::connect(&settings.database_url)
        .await
        .context("failed to connect to postgres")?;
    let cache = RedisStatsCache::new(&settings.redis_url).context("failed to create redis client")?;

    tracing::info!("using postgres product store and redis stats cache");
    Ok(AppServices::new(Arc::new(store), Arc::new(cache), settings))
}
