use crate::dto::HealthResponse;
use crate::extract::JsonBody;

/// `GET /health`
pub async fn health() -> JsonBody<HealthResponse> {
    JsonBody(HealthResponse {
        status: "ok".to_string(),
        version: todoapp_core::core_version().to_string(),
    })
}
