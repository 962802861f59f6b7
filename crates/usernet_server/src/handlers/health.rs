use axum::Json;
use serde::Serialize;
use usernet_core::model::user::now_epoch_ms;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
    pub version: &'static str,
}

/// Liveness check. Does not touch the store.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: now_epoch_ms(),
        version: usernet_core::core_version(),
    })
}
