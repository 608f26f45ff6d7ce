//! Health Routes
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health - Stream statistics

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let hub = state.hub.stats();
    let reader = state.reader_stats.snapshot();

    let status = if state.hub.is_closed() {
        "stopped"
    } else if hub.frames_published == 0 {
        "waiting"
    } else {
        "streaming"
    };

    Json(HealthResponse {
        status: status.to_string(),
        subscribers: hub.subscribers,
        frames_published: hub.frames_published,
        frames_dropped: hub.drops,
        frames_invalid: reader.frames_rejected,
        bytes_read: reader.bytes_read,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
