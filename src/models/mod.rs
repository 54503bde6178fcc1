//! Data models
//!
//! This module contains the data structures used throughout the ParkWise engine.
//! Models represent:
//! - Store entities (Spot, VehicleSession, RateSchedule)
//! - Billing results (StayCharge, FeeBreakdown, ExitReceipt)
//! - API request/response types

mod fee;
mod rate;
mod session;
mod spot;

pub use fee::{ExitReceipt, FeeBreakdown, StayCharge};
pub use rate::{RateSchedule, UpdateRatesInput, MAX_HOURLY_RATE};
pub(crate) use rate::round_cents;
pub use session::{
    EntryRequest, ExitRequest, ForceOpenInput, SessionExit, SpotAssignment, VehicleSession,
};
pub use spot::{
    compare_spot_ids, next_spot_id, CreateSpotInput, OccupancySummary, Spot, SpotCategory,
    SpotFilter,
};
