use axum::{routing::get, Router};

pub mod items;
pub mod stats;
pub mod system;

/// Router for the public API (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .route("/items", get(items::list_items))
        .route("/stats/avg-price-by-category", get(stats::avg_price_by_category))
        .route("/health", get(system::health))
}
