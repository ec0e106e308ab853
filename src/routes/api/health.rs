use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::response::{ApiResult, JsonApiResponse};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> ApiResult<HealthStatus> {
    JsonApiResponse::ok(HealthStatus {
        status: "ok",
        timestamp: Utc::now(),
    })
}
