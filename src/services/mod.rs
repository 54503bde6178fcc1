//! Services layer - Business logic
//!
//! This module contains the parking engine services:
//! - Fee calculation (pure)
//! - Rate schedule management
//! - Spot inventory and session ledger over the store
//! - The allocator coordinating entry and exit transitions

pub mod allocator;
pub mod error;
pub mod fee;
pub mod inventory;
pub mod ledger;
pub mod rates;
pub mod selection;

pub use allocator::{normalize_plate, Allocator};
pub use error::ParkingError;
pub use fee::{additional_due, calculate_fee, fee_breakdown, QUARTER_HOUR_MS};
pub use inventory::SpotInventory;
pub use ledger::SessionLedger;
pub use rates::RateScheduleService;
pub use selection::{LowestIdSelector, RandomSelector, SpotSelector};
