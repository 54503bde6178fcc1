//! Engine error kinds

use crate::models::SpotCategory;

/// Errors returned by the parking services.
///
/// Every kind except `Internal` is a recoverable domain error that leaves the
/// store unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ParkingError {
    /// The plate already has an active session
    #[error("Vehicle {0} is already parked")]
    DuplicatePlate(String),

    /// No free spot of the category (or its fallback)
    #[error("No free spots available for category: {0}")]
    NoSpotsAvailable(SpotCategory),

    #[error("Spot not found: {0}")]
    SpotNotFound(String),

    #[error("Spot is occupied: {0}")]
    SpotAlreadyOccupied(String),

    #[error("Spot id already exists: {0}")]
    DuplicateId(String),

    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No active session for the plate (administrative close)
    #[error("No active session for vehicle: {0}")]
    SessionNotFound(String),

    /// Store failure
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
