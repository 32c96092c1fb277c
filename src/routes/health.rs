use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Process liveness. Never touches the database.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
