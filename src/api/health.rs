//! Liveness endpoint

use axum::{Json, extract::State};
use chrono::Utc;

use super::dto::HealthResponse;
use crate::AppState;
use crate::metrics::{APP_UPTIME_SECONDS, HTTP_REQUESTS_TOTAL};

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = state.uptime().as_secs_f64();
    APP_UPTIME_SECONDS.set(uptime);

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/health", "200"])
        .inc();

    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        uptime,
    })
}
