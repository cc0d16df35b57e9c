use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::alerts::HealthStatus;
use crate::orchestrator::{Orchestrator, TickStats};

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(flatten)]
    pub health: HealthStatus,
}

/// Liveness probe: 200 while healthy, 503 otherwise
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.orchestrator.health();
    let (code, status) = if health.healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            health,
        }),
    )
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Serialize)]
pub struct StatsResponse {
    pub handlers: usize,
    pub pending_records: usize,
    #[serde(flatten)]
    pub ticks: TickStats,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        handlers: state.orchestrator.handler_count(),
        pending_records: state.orchestrator.buffer().len(),
        ticks: state.orchestrator.stats(),
    })
}
