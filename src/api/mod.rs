//! API layer - HTTP handlers and routing
//!
//! This module contains the HTTP API of the parking engine:
//! - Entry and exit flows
//! - Spot and rate listings
//! - Dashboard and health
//! - Admin endpoints (spots, rates, sessions, history)

pub mod admin;
pub mod dashboard;
pub mod entry;
pub mod exit;
pub mod middleware;
pub mod rates;
pub mod spots;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (token gated)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_admin_token,
        ));

    // Public routes
    Router::new()
        .nest("/entry", entry::router())
        .nest("/exit", exit::router())
        .nest("/spots", spots::router())
        .nest("/rates", rates::router())
        .merge(dashboard::router())
        .merge(admin_routes)
}

/// Build the complete router with middleware
///
/// # Errors
/// Returns an error if `cors_origin` is not a valid header value.
pub fn build_router(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                // Request stats (outermost, runs for all requests)
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::request_stats_middleware,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
