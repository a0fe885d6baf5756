use axum::{http::StatusCode, response::IntoResponse, Json};

pub const SERVICE_NAME: &str = "product-statistics-api";

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "service": SERVICE_NAME,
        })),
    )
}
