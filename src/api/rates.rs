//! Rate schedule endpoint
//!
//! - GET /api/v1/rates - Current rates and the plans on offer

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::RateSchedule;

#[derive(Debug, Serialize)]
pub struct RatesResponse {
    #[serde(flatten)]
    pub rates: RateSchedule,
    pub plan_hours: Vec<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_rates))
}

async fn get_rates(State(state): State<AppState>) -> Result<Json<RatesResponse>, ApiError> {
    let rates = state.rates.get().await?;
    Ok(Json(RatesResponse {
        rates,
        plan_hours: state.allocator.plan_hours().to_vec(),
    }))
}
