//! Entry API endpoint
//!
//! - POST /api/v1/entry - Admit a vehicle and assign a spot

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{EntryRequest, SpotAssignment};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(enter))
}

/// POST /api/v1/entry
async fn enter(
    State(state): State<AppState>,
    Json(request): Json<EntryRequest>,
) -> Result<(StatusCode, Json<SpotAssignment>), ApiError> {
    let assignment = state.allocator.entry(&request).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}
