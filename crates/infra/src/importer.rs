//! Product import pipeline: fetch, parse, normalize, clean, upsert.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use prodstats_products::{clean, normalize, FeedError, RawFeed};

use crate::source::FeedSource;
use crate::store::{ProductStore, StoreError};

/// Counters reported by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub created: usize,
    pub updated: usize,
    /// Rows removed during cleaning (missing values, invalid prices, duplicates).
    /// The legacy import service always reported 0 here.
    pub skipped: usize,
    /// Cleaned rows that could not be stored.
    pub errors: usize,
    /// Cleaned rows offered to the store, including the failed ones.
    pub total_processed: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created={} updated={} skipped={} errors={} total={}",
            self.created, self.updated, self.skipped, self.errors, self.total_processed
        )
    }
}

/// The single error surfaced by imports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Import failed: No data source available")]
    NoSource,

    #[error("Import failed: cannot read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("Import failed: {0}")]
    Feed(#[from] FeedError),

    #[error("Import failed: {0}")]
    Store(#[from] StoreError),
}

pub struct ProductImporter {
    source: FeedSource,
    store: Arc<dyn ProductStore>,
}

impl ProductImporter {
    pub fn new(source: FeedSource, store: Arc<dyn ProductStore>) -> Self {
        Self { source, store }
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    /// Run a full import from the configured source.
    #[instrument(skip(self), fields(url = self.source.url()), err)]
    pub async fn import_products(&self) -> Result<ImportStats, ImportError> {
        let started = Instant::now();
        let payload = self.source.fetch().await?;
        let stats = self.import_bytes(&payload.bytes, Utc::now()).await?;

        info!(
            origin = %payload.origin,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            errors = stats.errors,
            total = stats.total_processed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "import completed"
        );
        Ok(stats)
    }

    /// Import an already-fetched CSV payload. `now` stamps missing
    /// `updated_at` values and the created/modified timestamps.
    pub async fn import_bytes(&self, bytes: &[u8], now: DateTime<Utc>) -> Result<ImportStats, ImportError> {
        let feed = RawFeed::from_csv(bytes)?;
        let frame = normalize(&feed)?;
        let report = clean(&frame, now);

        for err in &report.errors {
            warn!(row = err.row, name = %err.name, error = %err.message, "row rejected");
        }

        let outcome = self.store.upsert_products(&report.products, now).await?;

        Ok(ImportStats {
            created: outcome.created,
            updated: outcome.updated,
            skipped: report.skipped(),
            errors: report.errors.len(),
            total_processed: report.processed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryProductStore;
    use chrono::TimeZone;
    use prodstats_core::ExternalId;
    use std::io::Write;
    use std::time::Duration;

    const STANDARD: &str = "name,category,price,updated_at
Laptop Pro 15,Electronics,1299.99,2024-01-15T10:30:00Z
Wireless Mouse,Electronics,29.99,2024-01-15T10:30:00Z
USB-C Hub,Electronics,49.99,2024-01-16T08:00:00Z
Office Chair,Furniture,299.99,2024-01-14T14:20:00Z
Standing Desk,Furniture,549.99,2024-01-14T14:20:00Z
Desk Lamp,Furniture,45.99,2024-01-17T09:15:00Z
Python Cookbook,Books,39.99,2024-01-13T11:00:00Z
Clean Code,Books,44.99,2024-01-13T11:00:00Z
";

    fn importer_for(contents: &str) -> (ProductImporter, Arc<InMemoryProductStore>, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let store = Arc::new(InMemoryProductStore::new());
        let source = FeedSource::new(None, file.path(), Duration::from_secs(1));
        (ProductImporter::new(source, store.clone()), store, file)
    }

    #[tokio::test]
    async fn imports_fallback_file() {
        let (importer, store, _file) = importer_for(STANDARD);
        let stats = importer.import_products().await.unwrap();
        assert_eq!(stats.created, 8);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.total_processed, 8);
        assert_eq!(store.len(), 8);
    }

    #[tokio::test]
    async fn reimport_is_idempotent() {
        let (importer, store, _file) = importer_for(STANDARD);
        importer.import_products().await.unwrap();
        let stats = importer.import_products().await.unwrap();
        assert_eq!(stats.created, 0);
        assert_eq!(stats.updated, 8);
        assert_eq!(store.len(), 8);
    }

    #[tokio::test]
    async fn counts_skipped_and_error_rows() {
        let csv = "product_name,type,cost,last_updated
Lamp,Furniture,45.99,
Broken,Furniture,-1,
,Furniture,10,
Huge,Furniture,100000000.00,
lamp,furniture,49.99,
";
        let (importer, store, _file) = importer_for(csv);
        let stats = importer.import_products().await.unwrap();
        assert_eq!(
            stats,
            ImportStats {
                created: 1,
                updated: 0,
                skipped: 3,
                errors: 1,
                total_processed: 2,
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn offset_timestamps_are_stored_in_utc() {
        let (importer, store, _file) = importer_for("");
        let csv = "name,category,price,updated_at\nKettle,Kitchen,24.50,2024-01-01T10:00:00+03:00\n";
        let stats = importer.import_bytes(csv.as_bytes(), Utc::now()).await.unwrap();
        assert_eq!(stats.created, 1);

        let stored = store
            .get_by_external_id(&ExternalId::derive("Kettle", "Kitchen"))
            .unwrap();
        assert_eq!(stored.updated_at, Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap());
        assert_eq!(stored.price.cents(), 2450);
    }

    #[tokio::test]
    async fn missing_columns_fail_the_import() {
        let (importer, _store, _file) = importer_for("name,price\nLamp,10\n");
        let err = importer.import_products().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Import failed: Missing required columns: category, updated_at"
        );
    }

    #[tokio::test]
    async fn missing_source_fails_the_import() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryProductStore::new());
        let source = FeedSource::new(None, dir.path().join("none.csv"), Duration::from_secs(1));
        let importer = ProductImporter::new(source, store);
        assert_eq!(importer.import_products().await.unwrap_err(), ImportError::NoSource);
    }
}
