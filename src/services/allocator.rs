//! Allocator
//!
//! Coordinates the spot inventory, the session ledger and the rate schedule
//! for vehicle entry and exit. Inventory and ledger are two views of one
//! occupancy fact; every transition that touches both runs under a single
//! async lock so that no interleaving can leave them out of step.
//!
//! Entry:
//! 1. validate plate and plan
//! 2. refuse a plate that is already parked
//! 3. find free spots of the requested category, falling back to regular
//!    for disability and electric requests
//! 4. pick one through the configured selector
//! 5. occupy the spot, then record the session with a rate snapshot
//!
//! Exit bills the session from its own snapshot, frees the spot, then closes
//! the session.

use super::fee;
use super::{ParkingError, RateScheduleService, SessionLedger, SpotInventory, SpotSelector};
use crate::models::{
    CreateSpotInput, EntryRequest, ExitReceipt, FeeBreakdown, ForceOpenInput, SessionExit, Spot,
    SpotAssignment, SpotCategory, VehicleSession,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Longest plate accepted by the store
const MAX_PLATE_LEN: usize = 32;

pub struct Allocator {
    inventory: Arc<SpotInventory>,
    ledger: Arc<SessionLedger>,
    rates: Arc<RateScheduleService>,
    selector: Arc<dyn SpotSelector>,
    plan_hours: Vec<u32>,
    transitions: Mutex<()>,
}

impl Allocator {
    /// Create an allocator
    ///
    /// # Arguments
    /// * `plan_hours` - plan durations a driver may choose at entry
    pub fn new(
        inventory: Arc<SpotInventory>,
        ledger: Arc<SessionLedger>,
        rates: Arc<RateScheduleService>,
        selector: Arc<dyn SpotSelector>,
        plan_hours: Vec<u32>,
    ) -> Self {
        Self {
            inventory,
            ledger,
            rates,
            selector,
            plan_hours,
            transitions: Mutex::new(()),
        }
    }

    pub fn plan_hours(&self) -> &[u32] {
        &self.plan_hours
    }

    /// Admit a vehicle now
    pub async fn entry(&self, request: &EntryRequest) -> Result<SpotAssignment, ParkingError> {
        self.entry_at(request, now_millis()).await
    }

    /// Admit a vehicle at `entry_time` (ms since epoch).
    ///
    /// # Errors
    /// - `InvalidInput` for a blank plate or a plan outside the configured set
    /// - `DuplicatePlate` if the plate is already parked
    /// - `NoSpotsAvailable` if neither the category nor its fallback has a free spot
    pub async fn entry_at(
        &self,
        request: &EntryRequest,
        entry_time: i64,
    ) -> Result<SpotAssignment, ParkingError> {
        let plate = normalize_plate(&request.plate_number)?;
        self.validate_plan(request.plan_hours)?;
        let category = request.category;

        let _guard = self.transitions.lock().await;

        if self.ledger.find_active(&plate).await?.is_some() {
            return Err(ParkingError::DuplicatePlate(plate));
        }

        let candidates = self.candidates(category).await?;
        let chosen = self
            .selector
            .select(&candidates)
            .cloned()
            .ok_or(ParkingError::NoSpotsAvailable(category))?;

        let assignment = self
            .open_on_spot(&plate, &chosen, category, entry_time, request.plan_hours)
            .await?;

        tracing::info!(
            plate = %plate,
            spot = %assignment.spot.id,
            requested = %category,
            assigned = %assignment.spot.category,
            plan_hours = request.plan_hours,
            upfront = assignment.upfront_amount,
            "Vehicle entered"
        );
        Ok(assignment)
    }

    /// Release a vehicle now
    pub async fn exit(&self, plate_number: &str) -> Result<ExitReceipt, ParkingError> {
        self.exit_at(plate_number, now_millis()).await
    }

    /// Release a vehicle at `exit_time` (ms since epoch).
    ///
    /// A plate with no active session leaves free of charge.
    pub async fn exit_at(
        &self,
        plate_number: &str,
        exit_time: i64,
    ) -> Result<ExitReceipt, ParkingError> {
        let plate = normalize_plate(plate_number)?;

        let _guard = self.transitions.lock().await;

        let Some(session) = self.ledger.find_active(&plate).await? else {
            tracing::info!(plate = %plate, "Unknown vehicle exited without charge");
            return Ok(ExitReceipt::UnknownVehicle {
                plate_number: plate,
            });
        };

        let breakdown = self.close_session(&session, exit_time).await?;
        Ok(ExitReceipt::Charged(breakdown))
    }

    /// Bill a parked vehicle as if it left now, without closing anything
    pub async fn quote(&self, plate_number: &str) -> Result<ExitReceipt, ParkingError> {
        self.quote_at(plate_number, now_millis()).await
    }

    pub async fn quote_at(
        &self,
        plate_number: &str,
        at: i64,
    ) -> Result<ExitReceipt, ParkingError> {
        let plate = normalize_plate(plate_number)?;

        match self.ledger.find_active(&plate).await? {
            Some(session) => {
                let (_, breakdown) = fee::fee_breakdown(&session, at)?;
                Ok(ExitReceipt::Charged(breakdown))
            }
            None => Ok(ExitReceipt::UnknownVehicle {
                plate_number: plate,
            }),
        }
    }

    /// Park a vehicle on a specific spot regardless of category.
    ///
    /// # Errors
    /// - `InvalidInput` for an entry time before the epoch or in the future
    /// - `SpotNotFound` / `SpotAlreadyOccupied` for a missing or taken spot
    /// - `DuplicatePlate` if the plate is already parked
    pub async fn force_open(&self, input: &ForceOpenInput) -> Result<SpotAssignment, ParkingError> {
        let plate = normalize_plate(&input.plate_number)?;
        self.validate_plan(input.plan_hours)?;
        let now = now_millis();
        let entry_time = input.entry_time.unwrap_or(now);
        if !(0..=now).contains(&entry_time) {
            return Err(ParkingError::InvalidInput(format!(
                "Entry time {} must be between 0 and the current time",
                entry_time
            )));
        }

        let _guard = self.transitions.lock().await;

        if self.ledger.find_active(&plate).await?.is_some() {
            return Err(ParkingError::DuplicatePlate(plate));
        }

        let spot = self
            .inventory
            .get(&input.spot_id)
            .await?
            .ok_or_else(|| ParkingError::SpotNotFound(input.spot_id.clone()))?;
        if spot.occupied || self.ledger.find_active_by_spot(&spot.id).await?.is_some() {
            return Err(ParkingError::SpotAlreadyOccupied(spot.id));
        }

        let assignment = self
            .open_on_spot(&plate, &spot, spot.category, entry_time, input.plan_hours)
            .await?;

        tracing::info!(
            plate = %plate,
            spot = %assignment.spot.id,
            entry_time,
            "Session opened by administrator"
        );
        Ok(assignment)
    }

    /// Close a known session, billing it like a regular exit.
    ///
    /// # Errors
    /// `SessionNotFound` if the plate has no active session.
    pub async fn force_close(
        &self,
        plate_number: &str,
        exit_time: Option<i64>,
    ) -> Result<FeeBreakdown, ParkingError> {
        let plate = normalize_plate(plate_number)?;
        let exit_time = exit_time.unwrap_or_else(now_millis);

        let _guard = self.transitions.lock().await;

        let session = self
            .ledger
            .find_active(&plate)
            .await?
            .ok_or_else(|| ParkingError::SessionNotFound(plate.clone()))?;

        let breakdown = self.close_session(&session, exit_time).await?;
        tracing::info!(plate = %plate, "Session closed by administrator");
        Ok(breakdown)
    }

    /// Add a spot to the inventory
    pub async fn add_spot(&self, input: &CreateSpotInput) -> Result<Spot, ParkingError> {
        let _guard = self.transitions.lock().await;

        let spot = self.inventory.add(input).await?;
        tracing::info!(spot = %spot.id, category = %spot.category, "Spot added");
        Ok(spot)
    }

    /// Remove a free spot from the inventory
    pub async fn remove_spot(&self, id: &str) -> Result<(), ParkingError> {
        let _guard = self.transitions.lock().await;

        self.inventory.remove(id).await?;
        tracing::info!(spot = %id, "Spot removed");
        Ok(())
    }

    /// Free spots for a request, applying the category fallback
    async fn candidates(&self, category: SpotCategory) -> Result<Vec<Spot>, ParkingError> {
        let free = self.inventory.list_free(category).await?;
        if !free.is_empty() {
            return Ok(free);
        }
        match category.fallback() {
            Some(fallback) => self.inventory.list_free(fallback).await,
            None => Ok(free),
        }
    }

    /// Occupy `spot` and record the session. Must be called under the lock.
    async fn open_on_spot(
        &self,
        plate: &str,
        spot: &Spot,
        requested_category: SpotCategory,
        entry_time: i64,
        plan_hours: u32,
    ) -> Result<SpotAssignment, ParkingError> {
        let rates = self.rates.get().await?;
        let occupied = self.inventory.occupy(&spot.id, plate).await?;

        let session = VehicleSession::open(
            plate,
            &occupied.id,
            requested_category,
            entry_time,
            plan_hours,
            &rates,
        );

        let session = match self.ledger.open(&session).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(
                    plate = %plate,
                    spot = %occupied.id,
                    "Failed to record session, releasing spot: {}",
                    err
                );
                if let Err(release_err) = self.inventory.release(&occupied.id).await {
                    tracing::error!(
                        spot = %occupied.id,
                        "Failed to release spot after aborted entry: {}",
                        release_err
                    );
                }
                return Err(err);
            }
        };

        Ok(SpotAssignment {
            upfront_amount: session.amount_paid,
            spot: occupied,
            session,
        })
    }

    /// Bill, free and close. Must be called under the lock.
    ///
    /// The spot is released before the session is closed so that a failed
    /// release leaves the session active and the exit can be retried. If the
    /// close then fails, the spot is taken back for the session's plate.
    async fn close_session(
        &self,
        session: &VehicleSession,
        exit_time: i64,
    ) -> Result<FeeBreakdown, ParkingError> {
        let (charge, breakdown) = fee::fee_breakdown(session, exit_time)?;
        let exit = SessionExit::new(exit_time, &charge, breakdown.additional_due);

        self.inventory.release(&session.spot_id).await?;

        if let Err(err) = self.ledger.close(session, exit).await {
            tracing::warn!(
                plate = %session.plate_number,
                spot = %session.spot_id,
                "Failed to close session, re-occupying spot: {}",
                err
            );
            if let Err(occupy_err) = self
                .inventory
                .occupy(&session.spot_id, &session.plate_number)
                .await
            {
                tracing::error!(
                    spot = %session.spot_id,
                    "Failed to re-occupy spot after aborted exit: {}",
                    occupy_err
                );
            }
            return Err(err);
        }

        tracing::info!(
            plate = %session.plate_number,
            spot = %session.spot_id,
            billed_hours = breakdown.billed_hours,
            total = breakdown.total_amount,
            additional_due = breakdown.additional_due,
            "Vehicle exited"
        );
        Ok(breakdown)
    }

    fn validate_plan(&self, plan_hours: u32) -> Result<(), ParkingError> {
        if !self.plan_hours.contains(&plan_hours) {
            return Err(ParkingError::InvalidInput(format!(
                "Plan of {} hours is not offered (choose one of {:?})",
                plan_hours, self.plan_hours
            )));
        }
        Ok(())
    }
}

/// Trim and upper-case a plate number
pub fn normalize_plate(raw: &str) -> Result<String, ParkingError> {
    let plate = raw.trim().to_uppercase();
    if plate.is_empty() {
        return Err(ParkingError::InvalidInput(
            "Plate number cannot be empty".to_string(),
        ));
    }
    if plate.chars().count() > MAX_PLATE_LEN {
        return Err(ParkingError::InvalidInput(format!(
            "Plate number longer than {} characters",
            MAX_PLATE_LEN
        )));
    }
    Ok(plate)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
