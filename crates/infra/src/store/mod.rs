//! Product persistence boundary.
//!
//! The store owns product identity (`id`), creation/modification timestamps and
//! the uniqueness of `external_id`. Everything else arrives already cleaned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use prodstats_products::{CategoryPriceTotal, NormalizedProduct, Ordering, Product, ProductFilter};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryProductStore;
pub use postgres::PostgresProductStore;

/// Counts produced by an upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("store unavailable in {0}")]
    Unavailable(&'static str),

    #[error("invalid stored row: {0}")]
    InvalidRow(String),

    #[error("store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert new products and update existing ones (matched on `external_id`)
    /// in a single atomic step.
    ///
    /// Within one batch a repeated `external_id` is applied in order, so the
    /// last occurrence wins.
    async fn upsert_products(
        &self,
        products: &[NormalizedProduct],
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError>;

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    async fn list_products(
        &self,
        filter: &ProductFilter,
        ordering: &Ordering,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Product>, StoreError>;

    /// Sum and count of prices per exact category.
    async fn category_price_totals(&self) -> Result<Vec<CategoryPriceTotal>, StoreError>;
}
