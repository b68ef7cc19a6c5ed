//! Liveness endpoint.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// Service name reported by the liveness endpoint.
pub const SERVICE_NAME: &str = "entitlement-sync";

/// Liveness response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// GET / - Liveness probe, no auth.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::ok()))
}
