//! Billing result models

use serde::{Deserialize, Serialize};

/// Billed duration and amount for one stay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StayCharge {
    /// Duration rounded up to quarter hours
    pub billed_hours: f64,
    pub base_billed: f64,
    pub overtime_billed: f64,
    /// Whole currency units
    pub total: f64,
}

/// Everything the exit flow shows the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub plate_number: String,
    pub spot_id: String,
    pub entry_time: i64,
    pub exit_time: i64,
    pub plan_hours: u32,
    pub base_rate_snapshot: f64,
    pub overtime_rate_snapshot: f64,
    pub billed_hours: f64,
    pub base_billed: f64,
    pub overtime_billed: f64,
    pub total_amount: f64,
    pub paid_amount: f64,
    /// `max(0, total_amount - paid_amount)`; the figure collected at exit
    pub additional_due: f64,
}

/// Outcome of an exit request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExitReceipt {
    /// A known session was billed and closed
    Charged(FeeBreakdown),
    /// No active session for the plate; exit granted free of charge
    UnknownVehicle { plate_number: String },
}

impl ExitReceipt {
    /// Amount to collect at the barrier
    pub fn amount_due(&self) -> f64 {
        match self {
            Self::Charged(breakdown) => breakdown.additional_due,
            Self::UnknownVehicle { .. } => 0.0,
        }
    }
}
