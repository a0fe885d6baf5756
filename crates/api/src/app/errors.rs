use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use prodstats_infra::store::StoreError;
use prodstats_infra::StatsError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    tracing::error!(error = %err, "store request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
}

pub fn stats_error_to_response(err: StatsError) -> axum::response::Response {
    match err {
        StatsError::Store(e) => store_error_to_response(e),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_page() -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "Invalid page.")
}
