//! Exit API endpoints
//!
//! - POST /api/v1/exit - Bill and release a vehicle
//! - GET /api/v1/exit/{plate}/quote - Current bill without leaving

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{ExitReceipt, ExitRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(leave))
        .route("/{plate}/quote", get(quote))
}

/// POST /api/v1/exit
///
/// An unknown plate is a successful free exit (`status: unknown_vehicle`).
async fn leave(
    State(state): State<AppState>,
    Json(request): Json<ExitRequest>,
) -> Result<Json<ExitReceipt>, ApiError> {
    let receipt = state.allocator.exit(&request.plate_number).await?;
    Ok(Json(receipt))
}

/// GET /api/v1/exit/{plate}/quote
async fn quote(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> Result<Json<ExitReceipt>, ApiError> {
    let receipt = state.allocator.quote(&plate).await?;
    Ok(Json(receipt))
}
