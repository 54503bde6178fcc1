//! Admin API endpoints
//!
//! Handles facility administration:
//! - POST /api/v1/admin/spots - Add a spot
//! - DELETE /api/v1/admin/spots/{id} - Remove a free spot
//! - PUT /api/v1/admin/rates - Replace the rate schedule
//! - POST /api/v1/admin/rates/reset - Restore default rates
//! - GET /api/v1/admin/sessions - Active sessions
//! - POST /api/v1/admin/sessions - Open a session on a chosen spot
//! - DELETE /api/v1/admin/sessions/{plate} - Close a session
//! - GET /api/v1/admin/history - Closed sessions, newest first
//!
//! All routes sit behind the admin token gate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    CreateSpotInput, FeeBreakdown, ForceOpenInput, RateSchedule, Spot, SpotAssignment,
    UpdateRatesInput, VehicleSession,
};

/// Query parameters for history paging
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query parameters for closing a session
#[derive(Debug, Deserialize)]
pub struct ForceCloseQuery {
    /// Exit time in ms since epoch; defaults to now
    pub exit_time: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<VehicleSession>,
    pub total: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/spots", post(add_spot))
        .route("/spots/{id}", delete(remove_spot))
        .route("/rates", put(update_rates))
        .route("/rates/reset", post(reset_rates))
        .route("/sessions", get(list_active_sessions).post(force_open))
        .route("/sessions/{plate}", delete(force_close))
        .route("/history", get(list_history))
}

/// POST /api/v1/admin/spots
async fn add_spot(
    State(state): State<AppState>,
    Json(input): Json<CreateSpotInput>,
) -> Result<(StatusCode, Json<Spot>), ApiError> {
    let spot = state.allocator.add_spot(&input).await?;
    Ok((StatusCode::CREATED, Json(spot)))
}

/// DELETE /api/v1/admin/spots/{id}
async fn remove_spot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.allocator.remove_spot(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/rates
async fn update_rates(
    State(state): State<AppState>,
    Json(input): Json<UpdateRatesInput>,
) -> Result<Json<RateSchedule>, ApiError> {
    let rates = state.rates.set(&input).await?;
    Ok(Json(rates))
}

/// POST /api/v1/admin/rates/reset
async fn reset_rates(State(state): State<AppState>) -> Result<Json<RateSchedule>, ApiError> {
    let rates = state.rates.reset().await?;
    Ok(Json(rates))
}

/// GET /api/v1/admin/sessions
async fn list_active_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state.ledger.list_active().await?;
    Ok(Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    }))
}

/// POST /api/v1/admin/sessions
async fn force_open(
    State(state): State<AppState>,
    Json(input): Json<ForceOpenInput>,
) -> Result<(StatusCode, Json<SpotAssignment>), ApiError> {
    let assignment = state.allocator.force_open(&input).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// DELETE /api/v1/admin/sessions/{plate}
async fn force_close(
    State(state): State<AppState>,
    Path(plate): Path<String>,
    Query(query): Query<ForceCloseQuery>,
) -> Result<Json<FeeBreakdown>, ApiError> {
    let breakdown = state.allocator.force_close(&plate, query.exit_time).await?;
    Ok(Json(breakdown))
}

/// GET /api/v1/admin/history
async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state.ledger.history(query.limit, query.offset).await?;
    Ok(Json(SessionListResponse {
        total: sessions.len(),
        sessions,
    }))
}
