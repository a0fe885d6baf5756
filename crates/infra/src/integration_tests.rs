//! Integration tests for the full import pipeline.
//!
//! Tests: FeedSource → ProductImporter → ProductStore → CategoryStatsService
//!
//! Verifies:
//! - A URL feed with alternate column names lands in the store
//! - A successful job run invalidates the cached statistic
//! - Re-imports update in place

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{routing::get, Router};
    use tokio::sync::RwLock;

    use prodstats_core::ExternalId;
    use prodstats_products::{Ordering, ProductFilter};

    use crate::cache::InMemoryStatsCache;
    use crate::importer::ProductImporter;
    use crate::jobs::{ImportJobRunner, ImportTrigger, JobStatus, RetryPolicy};
    use crate::source::FeedSource;
    use crate::stats::CategoryStatsService;
    use crate::store::{InMemoryProductStore, ProductStore};

    const FIRST: &str = "product_name,type,cost,last_updated
Gaming Keyboard,Electronics,149.99,2024-01-20T12:00:00Z
Ergonomic Mouse,Electronics,79.99,2024-01-20T12:00:00Z
Bookshelf,Furniture,120.00,2024-01-19T08:00:00Z
";

    const SECOND: &str = "name,category,price,updated_at
gaming keyboard,electronics,129.99,2024-02-01T00:00:00Z
Bookshelf,Furniture,120.00,2024-01-19T08:00:00Z
";

    struct Fixture {
        feed: Arc<RwLock<&'static str>>,
        store: Arc<InMemoryProductStore>,
        stats: Arc<CategoryStatsService>,
        runner: ImportJobRunner,
    }

    async fn setup() -> Fixture {
        let feed = Arc::new(RwLock::new(FIRST));
        let served = feed.clone();
        let router = Router::new().route(
            "/products.csv",
            get(move || {
                let served = served.clone();
                async move { *served.read().await }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let store = Arc::new(InMemoryProductStore::new());
        let source = FeedSource::new(
            Some(format!("http://{addr}/products.csv")),
            "/nonexistent/products.csv",
            Duration::from_secs(5),
        );
        let importer = Arc::new(ProductImporter::new(source, store.clone()));
        let stats = Arc::new(CategoryStatsService::new(
            store.clone(),
            Arc::new(InMemoryStatsCache::new()),
            Duration::from_secs(300),
        ));
        let runner = ImportJobRunner::new(importer, stats.clone(), RetryPolicy::no_retry());

        Fixture {
            feed,
            store,
            stats,
            runner,
        }
    }

    #[tokio::test]
    async fn url_feed_reaches_store_and_stats() {
        let fx = setup().await;
        let run = fx.runner.run(ImportTrigger::Manual).await;
        assert_eq!(run.status, JobStatus::Completed);
        assert_eq!(run.stats.map(|s| s.created), Some(3));

        let electronics = ProductFilter::default().with_category("ELECTRONICS");
        assert_eq!(fx.store.count_products(&electronics).await.unwrap(), 2);

        let snapshot = fx.stats.avg_price_by_category().await.unwrap();
        let electronics = snapshot
            .data
            .iter()
            .find(|c| c.category == "Electronics")
            .unwrap();
        assert_eq!(electronics.avg_price_cents, 11499);
    }

    #[tokio::test]
    async fn job_run_invalidates_cached_statistic() {
        let fx = setup().await;
        fx.runner.run(ImportTrigger::Manual).await;
        fx.stats.avg_price_by_category().await.unwrap();
        assert!(fx.stats.avg_price_by_category().await.unwrap().cached);

        *fx.feed.write().await = SECOND;
        let run = fx.runner.run(ImportTrigger::Schedule).await;
        let stats = run.stats.unwrap();
        assert_eq!((stats.created, stats.updated), (0, 2));

        // Categories group case-sensitively: the renamed row forms its own group.
        let snapshot = fx.stats.avg_price_by_category().await.unwrap();
        assert!(!snapshot.cached);
        let prices: Vec<(&str, i64)> = snapshot
            .data
            .iter()
            .map(|c| (c.category.as_str(), c.avg_price_cents))
            .collect();
        assert_eq!(
            prices,
            vec![("Electronics", 7999), ("Furniture", 12000), ("electronics", 12999)]
        );
    }

    #[tokio::test]
    async fn reimport_updates_in_place() {
        let fx = setup().await;
        fx.runner.run(ImportTrigger::Manual).await;
        let id = ExternalId::derive("Gaming Keyboard", "Electronics");
        let before = fx.store.get_by_external_id(&id).unwrap();

        *fx.feed.write().await = SECOND;
        fx.runner.run(ImportTrigger::Manual).await;
        let after = fx.store.get_by_external_id(&id).unwrap();

        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.price.cents(), 12999);
        assert_eq!(after.name, "gaming keyboard");

        let listed = fx
            .store
            .list_products(&ProductFilter::default(), &Ordering::default(), 10, 0)
            .await
            .unwrap();
        assert_eq!(listed.first().map(|p| p.id), Some(after.id));
    }
}
