//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type and its mapping from engine errors
//! - Request statistics
//! - The admin token gate

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::db::repositories::{SqlxRateRepository, SqlxSessionRepository, SqlxSpotRepository};
use crate::db::DynDatabasePool;
use crate::services::{
    selection, Allocator, ParkingError, RateScheduleService, SessionLedger, SpotInventory,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub allocator: Arc<Allocator>,
    pub inventory: Arc<SpotInventory>,
    pub ledger: Arc<SessionLedger>,
    pub rates: Arc<RateScheduleService>,
    /// Shared secret for admin routes; `None` leaves them open
    pub admin_token: Option<Arc<str>>,
    pub request_stats: Arc<RequestStats>,
}

impl AppState {
    /// Wire the repositories and services over a migrated pool
    pub fn build(pool: DynDatabasePool, config: &Config) -> Self {
        let parking = &config.parking;

        let inventory = Arc::new(SpotInventory::new(SqlxSpotRepository::boxed(pool.clone())));
        let ledger = Arc::new(SessionLedger::new(SqlxSessionRepository::boxed(pool.clone())));
        let rates = Arc::new(RateScheduleService::new(
            SqlxRateRepository::boxed(pool.clone()),
            parking.default_base_rate,
            parking.default_overtime_rate,
        ));
        let selector = selection::from_config(parking.selection, parking.selection_seed);
        tracing::info!("Spot selection strategy: {}", selector.name());

        let allocator = Arc::new(Allocator::new(
            inventory.clone(),
            ledger.clone(),
            rates.clone(),
            selector,
            parking.plan_hours.clone(),
        ));

        Self {
            pool,
            allocator,
            inventory,
            ledger,
            rates,
            admin_token: config.admin.token.as_deref().map(Arc::from),
            request_stats: Arc::new(RequestStats::new()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("SERVICE_UNAVAILABLE", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// HTTP status for the error code
    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "SPOT_NOT_FOUND" | "SESSION_NOT_FOUND" => StatusCode::NOT_FOUND,
            "DUPLICATE_PLATE" | "NO_SPOTS_AVAILABLE" | "SPOT_OCCUPIED" | "DUPLICATE_ID" => {
                StatusCode::CONFLICT
            }
            "INVALID_RATE" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ParkingError> for ApiError {
    fn from(err: ParkingError) -> Self {
        let message = err.to_string();
        match err {
            ParkingError::DuplicatePlate(plate) => Self::with_details(
                "DUPLICATE_PLATE",
                message,
                serde_json::json!({ "plate_number": plate }),
            ),
            ParkingError::NoSpotsAvailable(category) => Self::with_details(
                "NO_SPOTS_AVAILABLE",
                message,
                serde_json::json!({ "category": category }),
            ),
            ParkingError::SpotNotFound(_) => Self::new("SPOT_NOT_FOUND", message),
            ParkingError::SpotAlreadyOccupied(_) => Self::new("SPOT_OCCUPIED", message),
            ParkingError::DuplicateId(_) => Self::new("DUPLICATE_ID", message),
            ParkingError::InvalidRate(_) => Self::new("INVALID_RATE", message),
            ParkingError::InvalidInput(_) => Self::new("VALIDATION_ERROR", message),
            ParkingError::SessionNotFound(_) => Self::new("SESSION_NOT_FOUND", message),
            ParkingError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                Self::internal_error("Internal server error")
            }
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Admin gate: when a token is configured, requests must present it
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.admin_token.as_deref() {
        let presented = extract_bearer_token(&request)
            .ok_or_else(|| ApiError::unauthorized("Missing admin token"))?;
        if presented != expected {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request with bad token");
            return Err(ApiError::unauthorized("Invalid admin token"));
        }
    }
    Ok(next.run(request).await)
}

/// Request statistics middleware
///
/// Records request count and response time.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;

    let duration_us = start.elapsed().as_micros() as u64;
    state.request_stats.record(duration_us);

    response
}
