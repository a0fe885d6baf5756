//! Cached category statistics.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use prodstats_products::{average_by_category, CategoryAvgPrice};

use crate::cache::{CacheError, StatsCache, AVG_PRICE_BY_CATEGORY_KEY};
use crate::store::{ProductStore, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A statistic plus whether it was served from the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub data: Vec<CategoryAvgPrice>,
    pub cached: bool,
}

pub struct CategoryStatsService {
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn StatsCache>,
    ttl: Duration,
}

impl CategoryStatsService {
    pub fn new(store: Arc<dyn ProductStore>, cache: Arc<dyn StatsCache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// Average price per category, read through the cache.
    ///
    /// Cache failures are logged and the value is computed from the store.
    #[instrument(skip(self), err)]
    pub async fn avg_price_by_category(&self) -> Result<StatsSnapshot, StatsError> {
        match self.cache.get(AVG_PRICE_BY_CATEGORY_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<CategoryAvgPrice>>(value) {
                Ok(data) => {
                    debug!("returning cached avg price by category");
                    return Ok(StatsSnapshot { data, cached: true });
                }
                Err(e) => warn!(error = %e, "discarding unreadable cached statistic"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "stats cache read failed"),
        }

        info!("calculating avg price by category");
        let totals = self.store.category_price_totals().await?;
        let data = average_by_category(&totals);

        match serde_json::to_value(&data) {
            Ok(value) => match self.cache.set(AVG_PRICE_BY_CATEGORY_KEY, value, self.ttl).await {
                Ok(()) => info!(ttl_secs = self.ttl.as_secs(), "cached avg price by category"),
                Err(e) => warn!(error = %e, "stats cache write failed"),
            },
            Err(e) => warn!(error = %e, "cannot serialize statistic for caching"),
        }

        Ok(StatsSnapshot { data, cached: false })
    }

    /// Drop the cached statistic so the next read recomputes it.
    pub async fn invalidate(&self) -> Result<(), CacheError> {
        self.cache.invalidate(AVG_PRICE_BY_CATEGORY_KEY).await?;
        info!("invalidated avg price by category cache");
        Ok(())
    }
}
