//! Dashboard and health endpoints
//!
//! - GET /api/v1/dashboard - Occupancy per category, revenue, request stats
//! - GET /api/v1/health - Store connectivity

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::config::DatabaseDriver;
use crate::models::{OccupancySummary, RateSchedule};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub occupancy: Vec<OccupancySummary>,
    pub active_sessions: usize,
    pub revenue: RevenueResponse,
    pub rates: RateSchedule,
    pub stats: StatsResponse,
}

#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    pub prepaid: f64,
    pub additional: f64,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_requests: u64,
    pub avg_response_time_us: f64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: DatabaseDriver,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/health", get(health))
}

async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, ApiError> {
    let occupancy = state.inventory.occupancy_summary().await?;
    let active_sessions = state.ledger.list_active().await?.len();
    let revenue = state.ledger.revenue().await?;
    let rates = state.rates.get().await?;

    Ok(Json(DashboardResponse {
        occupancy,
        active_sessions,
        revenue: RevenueResponse {
            prepaid: revenue.prepaid,
            additional: revenue.additional,
            total: revenue.total(),
        },
        rates,
        stats: StatsResponse {
            total_requests: state.request_stats.total_requests(),
            avg_response_time_us: state.request_stats.avg_response_time_us(),
            uptime_seconds: state.request_stats.uptime_seconds(),
        },
    }))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.pool.ping().await.map_err(|e| {
        tracing::warn!("Health check failed: {:#}", e);
        ApiError::unavailable("Database unreachable")
    })?;

    Ok(Json(HealthResponse {
        status: "ok",
        database: state.pool.driver(),
    }))
}
