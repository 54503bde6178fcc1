//! Vehicle session model

use serde::{Deserialize, Serialize};

use super::{RateSchedule, Spot, SpotCategory, StayCharge};

/// A vehicle's stay, from entry until exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSession {
    /// Store-assigned id (0 until persisted)
    pub id: i64,
    pub plate_number: String,
    pub spot_id: String,
    /// Category asked for at entry; differs from the spot's when fallback applied
    pub requested_category: SpotCategory,
    /// Milliseconds since epoch
    pub entry_time: i64,
    pub plan_hours: u32,
    pub base_rate_snapshot: f64,
    pub overtime_rate_snapshot: f64,
    /// Collected upfront at entry
    pub amount_paid: f64,
    /// Present once the session is closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<SessionExit>,
}

/// Exit fields attached to a session when it closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExit {
    pub exit_time: i64,
    pub billed_hours: f64,
    pub base_billed: f64,
    pub overtime_billed: f64,
    pub total_amount: f64,
    pub additional_due: f64,
}

impl VehicleSession {
    /// Open a session, copying the current rates by value
    pub fn open(
        plate_number: impl Into<String>,
        spot_id: impl Into<String>,
        requested_category: SpotCategory,
        entry_time: i64,
        plan_hours: u32,
        rates: &RateSchedule,
    ) -> Self {
        Self {
            id: 0,
            plate_number: plate_number.into(),
            spot_id: spot_id.into(),
            requested_category,
            entry_time,
            plan_hours,
            base_rate_snapshot: rates.base_hourly_rate,
            overtime_rate_snapshot: rates.overtime_hourly_rate,
            amount_paid: rates.upfront_amount(plan_hours),
            exit: None,
        }
    }
}

impl SessionExit {
    pub fn new(exit_time: i64, charge: &StayCharge, additional_due: f64) -> Self {
        Self {
            exit_time,
            billed_hours: charge.billed_hours,
            base_billed: charge.base_billed,
            overtime_billed: charge.overtime_billed,
            total_amount: charge.total,
            additional_due,
        }
    }
}

/// Entry flow request
#[derive(Debug, Clone, Deserialize)]
pub struct EntryRequest {
    pub plate_number: String,
    #[serde(default)]
    pub category: SpotCategory,
    pub plan_hours: u32,
}

/// Exit flow request
#[derive(Debug, Clone, Deserialize)]
pub struct ExitRequest {
    pub plate_number: String,
}

/// Result of a successful entry
#[derive(Debug, Clone, Serialize)]
pub struct SpotAssignment {
    pub spot: Spot,
    pub session: VehicleSession,
    /// `plan_hours * base_rate`, collected at entry
    pub upfront_amount: f64,
}

/// Administrative session creation bypassing category matching
#[derive(Debug, Clone, Deserialize)]
pub struct ForceOpenInput {
    pub plate_number: String,
    pub spot_id: String,
    pub plan_hours: u32,
    /// Backdated entry time (ms); defaults to now
    #[serde(default)]
    pub entry_time: Option<i64>,
}
