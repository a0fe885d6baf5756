use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;

/// Average price per category, served from the cache when warm.
pub async fn avg_price_by_category(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.stats.avg_price_by_category().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => errors::stats_error_to_response(e),
    }
}
