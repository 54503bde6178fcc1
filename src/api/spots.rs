//! Spot listing endpoint
//!
//! - GET /api/v1/spots?category=&free= - Inventory, ordered by id

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Spot, SpotFilter};

#[derive(Debug, Serialize)]
pub struct SpotListResponse {
    pub spots: Vec<Spot>,
    pub total: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_spots))
}

async fn list_spots(
    State(state): State<AppState>,
    Query(filter): Query<SpotFilter>,
) -> Result<Json<SpotListResponse>, ApiError> {
    let spots = state.inventory.list(&filter).await?;
    Ok(Json(SpotListResponse {
        total: spots.len(),
        spots,
    }))
}
