//! Health and status handlers

use axum::{extract::State, Json};
use cromper_executor::{PoolHealth, WorkerState};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    /// `degraded` while any worker is not running
    pub status: &'static str,
    pub version: String,
    pub uptime_secs: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolHealth>,
    pub disassembly_cache: CacheStats,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let pool = state.jobs.health();
    let degraded = pool
        .as_ref()
        .is_some_and(|p| p.workers.iter().any(|w| w.state != WorkerState::Running));
    let cache = state.differ.cache();
    Json(HealthCheckResponse {
        status: if degraded { "degraded" } else { "ok" },
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        pool,
        disassembly_cache: CacheStats {
            entries: cache.len(),
            hits: cache.hits(),
            misses: cache.misses(),
        },
    })
}
