//! Session ledger
//!
//! Active sessions and the closed-session history. A plate has at most one
//! active session; closing attaches the exit fields and the row stays as history.

use super::ParkingError;
use crate::db::repositories::{RevenueTotals, SessionRepository};
use crate::models::{SessionExit, VehicleSession};
use anyhow::Context;
use std::sync::Arc;

/// Default page size for history listings
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
/// Upper bound for a single history page
pub const MAX_HISTORY_LIMIT: i64 = 500;

pub struct SessionLedger {
    repo: Arc<dyn SessionRepository>,
}

impl SessionLedger {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Record a new active session
    pub async fn open(&self, session: &VehicleSession) -> Result<VehicleSession, ParkingError> {
        self.repo
            .create(session)
            .await
            .context("Failed to record session")
            .map_err(Into::into)
    }

    pub async fn find_active(&self, plate: &str) -> Result<Option<VehicleSession>, ParkingError> {
        self.repo
            .get_active_by_plate(plate)
            .await
            .context("Failed to look up active session")
            .map_err(Into::into)
    }

    pub async fn find_active_by_spot(
        &self,
        spot_id: &str,
    ) -> Result<Option<VehicleSession>, ParkingError> {
        self.repo
            .get_active_by_spot(spot_id)
            .await
            .context("Failed to look up spot session")
            .map_err(Into::into)
    }

    pub async fn list_active(&self) -> Result<Vec<VehicleSession>, ParkingError> {
        self.repo
            .list_active()
            .await
            .context("Failed to list active sessions")
            .map_err(Into::into)
    }

    /// Closed sessions, newest first. The limit is clamped to `1..=MAX_HISTORY_LIMIT`.
    pub async fn history(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<VehicleSession>, ParkingError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        self.repo
            .list_history(limit, offset)
            .await
            .context("Failed to list session history")
            .map_err(Into::into)
    }

    /// Close an active session, moving it to the history.
    ///
    /// # Errors
    /// `SessionNotFound` if the session was already closed.
    pub async fn close(
        &self,
        session: &VehicleSession,
        exit: SessionExit,
    ) -> Result<VehicleSession, ParkingError> {
        let closed = self
            .repo
            .close(session.id, &exit)
            .await
            .context("Failed to close session")?;
        if !closed {
            return Err(ParkingError::SessionNotFound(session.plate_number.clone()));
        }

        let mut closed_session = session.clone();
        closed_session.exit = Some(exit);
        Ok(closed_session)
    }

    /// Upfront plus additional amounts collected so far
    pub async fn revenue(&self) -> Result<RevenueTotals, ParkingError> {
        self.repo
            .revenue()
            .await
            .context("Failed to aggregate revenue")
            .map_err(Into::into)
    }
}
